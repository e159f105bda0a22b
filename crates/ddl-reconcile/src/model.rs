//! Declared schema model.
//!
//! These types describe the desired database structure. They are produced
//! once per run by [`crate::source::build_model`] (or built directly with the
//! builder methods below) and are read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::naming;

/// Index type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// B-tree index (default).
    #[default]
    BTree,
    /// Hash index.
    Hash,
    /// Full-text index.
    FullText,
}

/// A declared index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Index name. Unnamed indexes get a generated name when diffed.
    #[serde(default)]
    pub name: Option<String>,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a UNIQUE index.
    #[serde(default)]
    pub unique: bool,
    /// Index type.
    #[serde(default)]
    pub index_type: IndexType,
}

impl IndexDefinition {
    /// Creates a non-unique B-tree index over the given columns.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            index_type: IndexType::BTree,
        }
    }

    /// Sets the index name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the index UNIQUE.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index type.
    #[must_use]
    pub fn index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Returns the declared name or the generated one for `table`.
    #[must_use]
    pub fn resolved_name(&self, table: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| naming::index_name(table, &self.columns, self.unique))
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

/// A declared foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// Constraint name. Unnamed keys get a generated name when diffed.
    #[serde(default)]
    pub name: Option<String>,
    /// Column in the owning table.
    pub column: String,
    /// Referenced table.
    pub references_table: String,
    /// Referenced column.
    pub references_column: String,
}

impl ForeignKeyDefinition {
    /// Creates an unnamed foreign key.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            name: None,
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        }
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the declared name or the generated one for `table`.
    #[must_use]
    pub fn resolved_name(&self, table: &str) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| naming::foreign_key_name(table, &self.column))
    }
}

/// A relationship-to-one (the owning table holds the join column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToOneRelation {
    /// Target entity type name.
    pub target: String,
    /// Explicit join column; defaults to `<field>_id`.
    #[serde(default)]
    pub join_column: Option<String>,
    /// Referenced column; defaults to the target's primary key.
    #[serde(default)]
    pub referenced_column: Option<String>,
}

/// Many-to-many metadata carried by a collection field.
///
/// Each descriptor is one directed edge of the relationship. The side that
/// carries a "mapped-by" back-reference is not owning and never synthesizes
/// the junction table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManyToManyDescriptor {
    /// Explicit target type; wins over the collection element type.
    #[serde(default)]
    pub target: Option<String>,
    /// Whether this edge owns the junction table.
    pub owning: bool,
    /// Explicit junction table name.
    #[serde(default)]
    pub join_table: Option<String>,
    /// Junction column pointing back at the declaring entity.
    #[serde(default)]
    pub join_column: Option<String>,
    /// Junction column pointing at the target entity.
    #[serde(default)]
    pub inverse_join_column: Option<String>,
}

impl ManyToManyDescriptor {
    /// An owning edge with no overrides.
    #[must_use]
    pub fn owning() -> Self {
        Self {
            target: None,
            owning: true,
            join_table: None,
            join_column: None,
            inverse_join_column: None,
        }
    }

    /// A non-owning (mapped-by) edge.
    #[must_use]
    pub fn inverse() -> Self {
        Self {
            owning: false,
            ..Self::owning()
        }
    }
}

/// A collection-typed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRelation {
    /// Generic element type of the collection, when known.
    #[serde(default)]
    pub element_type: Option<String>,
    /// Present when the collection is a many-to-many relationship.
    #[serde(default)]
    pub many_to_many: Option<ManyToManyDescriptor>,
}

/// What a declared field maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// A plain column.
    Column,
    /// Relationship-to-one.
    ToOne(ToOneRelation),
    /// Collection; never a column of its own table.
    Collection(CollectionRelation),
    /// Computed or transient; never a column.
    Transient,
}

/// A declared field (logical column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredField {
    /// Language-level field identifier.
    pub identifier: String,
    /// Resolved column name.
    pub column_name: String,
    /// Logical type name (`String`, `Long`, `Decimal`, ...).
    pub logical_type: String,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Length or precision hint.
    pub length: Option<u32>,
    /// Scale hint.
    pub scale: Option<u32>,
    /// Column comment.
    pub comment: Option<String>,
    /// Primary key flag.
    pub primary_key: bool,
    /// Auto-increment flag.
    pub auto_increment: bool,
    /// Role of the field.
    pub kind: FieldKind,
}

impl DeclaredField {
    /// Creates a nullable plain column; the column name follows the naming
    /// convention.
    #[must_use]
    pub fn new(identifier: impl Into<String>, logical_type: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            column_name: naming::to_column_name(&identifier),
            identifier,
            logical_type: logical_type.into(),
            nullable: true,
            length: None,
            scale: None,
            comment: None,
            primary_key: false,
            auto_increment: false,
            kind: FieldKind::Column,
        }
    }

    /// A relationship-to-one field.
    #[must_use]
    pub fn to_one(identifier: impl Into<String>, target: impl Into<String>) -> Self {
        let mut field = Self::new(identifier, "Long");
        field.kind = FieldKind::ToOne(ToOneRelation {
            target: target.into(),
            join_column: None,
            referenced_column: None,
        });
        field
    }

    /// A many-to-many collection field.
    #[must_use]
    pub fn many_to_many(
        identifier: impl Into<String>,
        element_type: impl Into<String>,
        descriptor: ManyToManyDescriptor,
    ) -> Self {
        let mut field = Self::new(identifier, "Collection");
        field.kind = FieldKind::Collection(CollectionRelation {
            element_type: Some(element_type.into()),
            many_to_many: Some(descriptor),
        });
        field
    }

    /// Overrides the column name.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column_name = name.into();
        self
    }

    /// Marks the field as the primary key (implies NOT NULL).
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the field auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the field NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the length or precision hint.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets precision and scale.
    #[must_use]
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.length = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Marks the field transient.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.kind = FieldKind::Transient;
        self
    }

    /// Sets the explicit join column of a relationship-to-one field.
    #[must_use]
    pub fn join_column(mut self, name: impl Into<String>) -> Self {
        if let FieldKind::ToOne(ref mut relation) = self.kind {
            relation.join_column = Some(name.into());
        }
        self
    }

    /// Whether the field maps to a column of its own table.
    #[must_use]
    pub fn is_column(&self) -> bool {
        matches!(self.kind, FieldKind::Column | FieldKind::ToOne(_))
    }

    /// The column this field is diffed as, if any.
    ///
    /// Relationship-to-one fields use their explicit join column, else
    /// `<field>_id`. Collection and transient fields have none.
    #[must_use]
    pub fn diffable_column(&self) -> Option<String> {
        match &self.kind {
            FieldKind::Column => Some(self.column_name.clone()),
            FieldKind::ToOne(relation) => Some(
                relation
                    .join_column
                    .clone()
                    .unwrap_or_else(|| naming::join_column_name(&self.identifier)),
            ),
            FieldKind::Collection(_) | FieldKind::Transient => None,
        }
    }
}

/// A declared entity (logical table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredEntity {
    /// Language-level type name.
    pub identifier: String,
    /// Resolved table name.
    pub table_name: String,
    /// Table comment.
    pub comment: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<DeclaredField>,
    /// Declared indexes.
    pub indexes: Vec<IndexDefinition>,
    /// Explicit foreign keys (relationship-derived ones are computed).
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

impl DeclaredEntity {
    /// Creates an entity; the table name follows the naming convention.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            table_name: naming::to_table_name(&identifier),
            identifier,
            comment: None,
            fields: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Overrides the table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: DeclaredField) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds an explicit foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDefinition) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Primary key fields in declaration order.
    pub fn primary_key_fields(&self) -> impl Iterator<Item = &DeclaredField> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    /// Gets a field by identifier.
    #[must_use]
    pub fn get_field(&self, identifier: &str) -> Option<&DeclaredField> {
        self.fields.iter().find(|f| f.identifier == identifier)
    }
}

/// Endpoint of a junction table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JunctionEndpoint {
    /// Endpoint table.
    pub table: String,
    /// Junction column referencing it.
    pub column: String,
    /// Referenced column in the endpoint table.
    pub referenced_column: String,
    /// Logical type of the referenced key.
    pub key_type: String,
}

/// A junction table derived from a many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManyToManyTable {
    /// Junction table name.
    pub table_name: String,
    /// Endpoint whose table name sorts first.
    pub left: JunctionEndpoint,
    /// The other endpoint.
    pub right: JunctionEndpoint,
    /// Entity identifier of the owning side.
    pub owner_entity: String,
    /// Field identifier of the owning side.
    pub owner_field: String,
}
