//! Schema reconciliation for relational databases.
//!
//! `ddl-reconcile` compares a declared entity model with a snapshot of a live
//! database and emits the DDL that evolves the live schema into the declared
//! one:
//! - Only additive changes by default; dropping obsolete foreign keys is an
//!   explicit opt-in
//! - Statements are ordered so nothing is referenced before it exists
//! - SQL generation is dialect-aware (MySQL, PostgreSQL) and extensible at
//!   runtime
//!
//! # Architecture
//!
//! - **Model** - Declared entities, fields, relationships and indexes
//! - **Source** - Capability traits every model acquisition method implements
//! - **Snapshot** - The live schema as reported by the database
//! - **Scanner** - Derives junction tables from many-to-many relationships
//! - **Resolve** - Turns entities into concrete table definitions
//! - **Diff** - One pure function per change category
//! - **Plan** - Orders the changes into phases and renders them
//! - **Dialect** - Database-specific type mapping and SQL generation
//!
//! # Example
//!
//! ```rust
//! use ddl_reconcile::prelude::{
//!     generate_diff_ddl, DdlGenerator, DeclaredEntity, DeclaredField, DialectRegistry, DiffPolicy,
//!     LiveColumn, LiveSchema, LiveTable,
//! };
//!
//! let entities = vec![DeclaredEntity::new("Order")
//!     .field(DeclaredField::new("id", "Long").primary_key())
//!     .field(DeclaredField::new("amount", "Decimal"))
//!     .field(DeclaredField::new("status", "String"))];
//!
//! let live = LiveSchema::new().table(
//!     LiveTable::new("order")
//!         .column(LiveColumn::new("id", "bigint"))
//!         .column(LiveColumn::new("amount", "numeric")),
//! );
//!
//! let registry = DialectRegistry::with_builtins();
//! let generator = DdlGenerator::for_database("POSTGRES", &registry)?;
//! let result = generate_diff_ddl(&entities, &live, &DiffPolicy::default(), &generator);
//!
//! assert_eq!(
//!     result.columns_to_add,
//!     vec!["ALTER TABLE \"order\" ADD COLUMN \"status\" TEXT"]
//! );
//! # Ok::<(), ddl_reconcile::error::ReconcileError>(())
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the DDL needed to bring a database in line with a model manifest
//! ddl-reconcile diff --model model.json --snapshot live.json --dialect postgres
//!
//! # Full schema for a model
//! ddl-reconcile schema --model model.json --dialect mysql
//!
//! # Registered dialects
//! ddl-reconcile dialects
//! ```

pub mod dialect;
pub mod diff;
pub mod error;
pub mod generator;
pub mod model;
pub mod naming;
pub mod plan;
pub mod policy;
pub mod provider;
pub mod resolve;
pub mod scanner;
pub mod snapshot;
pub mod source;
pub mod state;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{
        DialectRegistry, DialectStrategy, MySqlDialect, PostgresDialect, TypeRule,
    };
    pub use crate::diff::{DiffContext, Phase, SchemaChange};
    pub use crate::error::{DiffWarning, ReconcileError, Result};
    pub use crate::generator::{DdlGenerator, GeneratedSchema};
    pub use crate::model::{
        DeclaredEntity, DeclaredField, FieldKind, ForeignKeyDefinition, IndexDefinition,
        IndexType, ManyToManyDescriptor, ManyToManyTable,
    };
    pub use crate::plan::{generate_diff_ddl, reconcile, DiffResult, DiffSummary};
    pub use crate::policy::DiffPolicy;
    pub use crate::provider::{ManifestFile, ModelProvider, SnapshotFile, SnapshotProvider};
    pub use crate::resolve::{ColumnDefinition, TableDefinition};
    pub use crate::scanner::scan;
    pub use crate::snapshot::{LiveColumn, LiveForeignKey, LiveIndex, LiveSchema, LiveTable};
    pub use crate::source::{build_model, Annotation, EntitySource, FieldSource};
    pub use crate::state::{apply_changes, SchemaState};
}
