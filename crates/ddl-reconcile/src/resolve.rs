//! Resolution of the declared model into concrete table definitions.
//!
//! Relationship-to-one fields become a join column plus a derived foreign
//! key, collection and transient fields disappear, and every junction table
//! found by the scanner becomes a table of its own. Index and constraint
//! names are fixed here so everything downstream sees final names.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DiffWarning;
use crate::model::{
    DeclaredEntity, DeclaredField, FieldKind, ForeignKeyDefinition, IndexDefinition,
    JunctionEndpoint, ManyToManyTable,
};
use crate::scanner::{self, find_entity, primary_key_of};

/// A concrete column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Logical type name, mapped by the dialect.
    pub logical_type: String,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Length or precision.
    pub length: Option<u32>,
    /// Scale.
    pub scale: Option<u32>,
    /// Column comment.
    pub comment: Option<String>,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Auto-increment.
    pub auto_increment: bool,
}

impl ColumnDefinition {
    /// Creates a nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, logical_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logical_type: logical_type.into(),
            nullable: true,
            length: None,
            scale: None,
            comment: None,
            primary_key: false,
            auto_increment: false,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as part of the primary key. Implies NOT NULL.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column as generated by the database.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the length or precision.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn from_field(name: String, logical_type: String, field: &DeclaredField) -> Self {
        Self {
            name,
            logical_type,
            nullable: field.nullable && !field.primary_key,
            length: field.length,
            scale: field.scale,
            comment: field.comment.clone(),
            primary_key: field.primary_key,
            auto_increment: field.auto_increment,
        }
    }
}

/// A concrete table: what the database should contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Table comment.
    pub comment: Option<String>,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Indexes, all named.
    pub indexes: Vec<IndexDefinition>,
    /// Foreign keys, all named.
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

impl TableDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index, naming it if unnamed.
    #[must_use]
    pub fn index(mut self, index: IndexDefinition) -> Self {
        let name = index.resolved_name(&self.name);
        self.indexes.push(index.named(name));
        self
    }

    /// Adds a foreign key, naming it if unnamed.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDefinition) -> Self {
        let name = fk.resolved_name(&self.name);
        self.foreign_keys.push(fk.named(name));
        self
    }

    /// Primary key columns in declaration order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&ColumnDefinition> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Resolved tables plus the warnings raised on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Entity tables in declaration order, then junction tables by name.
    pub tables: Vec<TableDefinition>,
    /// Non-fatal conditions from scanning and resolution.
    pub warnings: Vec<DiffWarning>,
}

fn resolve_entity(
    entity: &DeclaredEntity,
    entities: &[DeclaredEntity],
    warnings: &mut Vec<DiffWarning>,
) -> TableDefinition {
    let mut table = TableDefinition::new(&entity.table_name);
    table.comment = entity.comment.clone();
    let mut derived = Vec::new();

    for field in &entity.fields {
        let Some(column_name) = field.diffable_column() else {
            continue;
        };
        match &field.kind {
            FieldKind::ToOne(relation) => match find_entity(entities, &relation.target) {
                Some(target) => {
                    let (key_column, key_type) = primary_key_of(target);
                    let referenced = relation.referenced_column.clone().unwrap_or(key_column);
                    derived.push(ForeignKeyDefinition::new(
                        &column_name,
                        &target.table_name,
                        referenced,
                    ));
                    table =
                        table.column(ColumnDefinition::from_field(column_name, key_type, field));
                }
                None => {
                    warn!(
                        table = %entity.table_name,
                        field = %field.identifier,
                        target = %relation.target,
                        "Relationship target is not declared, no foreign key derived"
                    );
                    warnings.push(DiffWarning::UnresolvedForeignKeyTarget {
                        table: entity.table_name.clone(),
                        field: field.identifier.clone(),
                        target: relation.target.clone(),
                    });
                    let logical_type = field.logical_type.clone();
                    table = table.column(ColumnDefinition::from_field(
                        column_name,
                        logical_type,
                        field,
                    ));
                }
            },
            _ => {
                let logical_type = field.logical_type.clone();
                table =
                    table.column(ColumnDefinition::from_field(column_name, logical_type, field));
            }
        }
    }

    for index in &entity.indexes {
        table = table.index(index.clone());
    }

    // Explicit keys win over derived ones on the same column.
    let explicit: BTreeSet<String> = entity
        .foreign_keys
        .iter()
        .map(|fk| fk.column.to_ascii_lowercase())
        .collect();
    for fk in &entity.foreign_keys {
        table = table.foreign_key(fk.clone());
    }
    for fk in derived {
        if !explicit.contains(&fk.column.to_ascii_lowercase()) {
            table = table.foreign_key(fk);
        }
    }
    table
}

fn endpoint_column(end: &JunctionEndpoint) -> ColumnDefinition {
    ColumnDefinition::new(&end.column, &end.key_type).primary_key()
}

/// Builds the table definition for a junction table: both endpoint columns
/// NOT NULL, a composite primary key, and a foreign key to each endpoint.
#[must_use]
pub fn junction_table(junction: &ManyToManyTable) -> TableDefinition {
    TableDefinition::new(&junction.table_name)
        .column(endpoint_column(&junction.left))
        .column(endpoint_column(&junction.right))
        .foreign_key(ForeignKeyDefinition::new(
            &junction.left.column,
            &junction.left.table,
            &junction.left.referenced_column,
        ))
        .foreign_key(ForeignKeyDefinition::new(
            &junction.right.column,
            &junction.right.table,
            &junction.right.referenced_column,
        ))
}

/// Scans junction tables and resolves every entity into a table definition.
#[must_use]
pub fn resolve(entities: &[DeclaredEntity]) -> Resolution {
    let scan = scanner::scan(entities);
    let mut warnings = scan.warnings;
    let mut tables: Vec<TableDefinition> = entities
        .iter()
        .map(|e| resolve_entity(e, entities, &mut warnings))
        .collect();

    for junction in &scan.tables {
        if tables.iter().any(|t| t.name == junction.table_name) {
            debug!(table = %junction.table_name, "Junction table is declared as an entity");
            continue;
        }
        tables.push(junction_table(junction));
    }

    Resolution { tables, warnings }
}
