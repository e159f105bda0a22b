//! Live schema snapshot.
//!
//! A normalized, already-fetched view of what the database actually contains.
//! The differ only reads it; [`crate::state`] replays changes onto an owned
//! copy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::IndexType;
use crate::naming;

/// A live column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// SQL type as reported by the database.
    #[serde(rename = "type", default)]
    pub sql_type: String,
    /// Whether the column allows NULL.
    #[serde(default = "nullable_default")]
    pub nullable: bool,
}

fn nullable_default() -> bool {
    true
}

impl LiveColumn {
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A live index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveIndex {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether the index is UNIQUE.
    #[serde(default)]
    pub unique: bool,
    /// Index type.
    #[serde(default)]
    pub index_type: IndexType,
}

impl LiveIndex {
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            index_type: IndexType::BTree,
        }
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Column set in sorted, convention-normalized order.
    #[must_use]
    pub fn sorted_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| naming::convention_key(c))
            .collect();
        columns.sort();
        columns
    }
}

/// A live foreign key. Some engines report keys without a constraint name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveForeignKey {
    /// Constraint name, when reported.
    #[serde(default)]
    pub name: Option<String>,
    /// Source column.
    pub column: String,
    /// Referenced table.
    pub references_table: String,
    /// Referenced column.
    pub references_column: String,
}

impl LiveForeignKey {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        }
    }

    /// Whether this key links the same columns as the given triple.
    #[must_use]
    pub fn links(&self, column: &str, references_table: &str, references_column: &str) -> bool {
        self.column.eq_ignore_ascii_case(column)
            && self.references_table.eq_ignore_ascii_case(references_table)
            && self.references_column.eq_ignore_ascii_case(references_column)
    }
}

/// A live table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTable {
    /// Table name.
    pub name: String,
    /// Columns in ordinal order.
    #[serde(default)]
    pub columns: Vec<LiveColumn>,
    /// Indexes; `None` when the index reader was unavailable for this table.
    #[serde(default)]
    pub indexes: Option<Vec<LiveIndex>>,
    /// Foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<LiveForeignKey>,
}

impl LiveTable {
    /// Creates an empty table with an empty (but available) index list.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Some(Vec::new()),
            foreign_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: LiveColumn) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn index(mut self, index: LiveIndex) -> Self {
        self.indexes.get_or_insert_with(Vec::new).push(index);
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, fk: LiveForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Marks the index reader as unavailable for this table.
    #[must_use]
    pub fn without_index_reader(mut self) -> Self {
        self.indexes = None;
        self
    }

    /// Whether the table has a column named `name` (ASCII-case-insensitive).
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Live indexes, empty when the reader was unavailable.
    #[must_use]
    pub fn indexes(&self) -> &[LiveIndex] {
        self.indexes.as_deref().unwrap_or_default()
    }
}

/// The live schema, keyed by exact table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSchema {
    /// Tables by name.
    #[serde(default)]
    pub tables: BTreeMap<String, LiveTable>,
}

impl LiveSchema {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table of the same name.
    #[must_use]
    pub fn table(mut self, table: LiveTable) -> Self {
        self.insert(table);
        self
    }

    /// Inserts a table, replacing any table of the same name.
    pub fn insert(&mut self, table: LiveTable) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Gets a table by exact name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&LiveTable> {
        self.tables.get(name)
    }

    /// Gets a mutable table by exact name.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut LiveTable> {
        self.tables.get_mut(name)
    }

    /// Whether the snapshot contains no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
