//! DDL generator facade.

use std::sync::Arc;

use tracing::warn;

use crate::dialect::{DialectRegistry, DialectStrategy};
use crate::diff::SchemaChange;
use crate::error::{DiffWarning, Result};
use crate::model::{DeclaredEntity, ForeignKeyDefinition, IndexDefinition};
use crate::resolve::{self, ColumnDefinition, TableDefinition};

/// Full schema DDL with the warnings raised while resolving the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSchema {
    /// Tables, then indexes, then foreign keys.
    pub statements: Vec<String>,
    /// Unresolved relationship targets.
    pub warnings: Vec<DiffWarning>,
}

/// Renders DDL through one dialect.
#[derive(Clone)]
pub struct DdlGenerator {
    dialect: Arc<dyn DialectStrategy>,
}

impl std::fmt::Debug for DdlGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdlGenerator")
            .field("dialect", &self.dialect.id())
            .finish()
    }
}

impl DdlGenerator {
    /// Wraps a concrete dialect.
    #[must_use]
    pub fn new<D: DialectStrategy + 'static>(dialect: D) -> Self {
        Self {
            dialect: Arc::new(dialect),
        }
    }

    /// Wraps an already shared dialect.
    #[must_use]
    pub fn from_arc(dialect: Arc<dyn DialectStrategy>) -> Self {
        Self { dialect }
    }

    /// Looks the dialect up in `registry`.
    pub fn for_database(database: &str, registry: &DialectRegistry) -> Result<Self> {
        registry.get_dialect(database).map(Self::from_arc)
    }

    /// The underlying dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn DialectStrategy {
        self.dialect.as_ref()
    }

    /// Engine identifier of the underlying dialect.
    #[must_use]
    pub fn dialect_id(&self) -> &'static str {
        self.dialect.id()
    }

    pub fn generate_create_table(&self, table: &TableDefinition) -> Vec<String> {
        self.dialect.generate_create_table(table)
    }

    pub fn generate_drop_table(&self, table: &str) -> String {
        self.dialect.generate_drop_table(table)
    }

    pub fn generate_add_column(&self, table: &str, column: &ColumnDefinition) -> Vec<String> {
        self.dialect.generate_add_column(table, column)
    }

    pub fn generate_drop_column(&self, table: &str, column: &str) -> String {
        self.dialect.generate_drop_column(table, column)
    }

    pub fn generate_add_foreign_key(&self, table: &str, fk: &ForeignKeyDefinition) -> String {
        self.dialect.generate_add_foreign_key(table, fk)
    }

    pub fn generate_drop_foreign_key(&self, table: &str, name: &str) -> String {
        self.dialect.generate_drop_foreign_key(table, name)
    }

    pub fn generate_create_index(&self, table: &str, index: &IndexDefinition) -> String {
        self.dialect.generate_create_index(table, index)
    }

    pub fn generate_add_comment(&self, table: &TableDefinition) -> Vec<String> {
        self.dialect.generate_add_comment(table)
    }

    pub fn column_type_name(
        &self,
        logical: &str,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> String {
        self.dialect.column_type_name(logical, precision, scale)
    }

    pub fn render_change(&self, change: &SchemaChange) -> Vec<String> {
        self.dialect.render_change(change)
    }

    /// Full schema for a declared model, junction tables included: every
    /// table, then every index, then every foreign key.
    #[must_use]
    pub fn generate_schema(&self, entities: &[DeclaredEntity]) -> Vec<String> {
        self.generate_schema_report(entities).statements
    }

    /// Like [`generate_schema`](Self::generate_schema), keeping the
    /// unresolved-relationship warnings.
    #[must_use]
    pub fn generate_schema_report(&self, entities: &[DeclaredEntity]) -> GeneratedSchema {
        let resolution = resolve::resolve(entities);
        for warning in &resolution.warnings {
            warn!(%warning, "Schema warning");
        }
        GeneratedSchema {
            statements: self.dialect.generate_schema(&resolution.tables),
            warnings: resolution.warnings,
        }
    }
}
