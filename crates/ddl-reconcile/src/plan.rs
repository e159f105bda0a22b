//! Diff orchestration.
//!
//! Runs every differ category, orders the changes into phases, renders them
//! through the selected dialect and assembles the [`DiffResult`].

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::diff::{
    diff_columns, diff_drop_foreign_keys, diff_foreign_keys, diff_indexes, diff_tables,
    CategoryDiff, DiffContext, Phase, SchemaChange,
};
use crate::error::{DiffWarning, Result};
use crate::generator::DdlGenerator;
use crate::model::DeclaredEntity;
use crate::policy::DiffPolicy;
use crate::provider::{ModelProvider, SnapshotProvider};
use crate::resolve;
use crate::snapshot::LiveSchema;
use crate::source;

/// Terminal artifact of a diff run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Engine identifier the statements were rendered for.
    pub dialect: String,
    /// Phase 1 statements.
    pub tables_to_create: Vec<String>,
    /// Phase 2 statements.
    pub columns_to_add: Vec<String>,
    /// Phase 3 statements.
    pub foreign_keys_to_drop: Vec<String>,
    /// Phase 4 statements.
    pub indexes_to_add: Vec<String>,
    /// Phase 5 statements.
    pub foreign_keys_to_add: Vec<String>,
    /// All statements in phase order, each non-empty phase preceded by a
    /// banner line starting with `--`.
    pub statements: Vec<String>,
    /// Structured changes in phase order.
    pub changes: Vec<SchemaChange>,
    /// Non-fatal conditions encountered.
    pub warnings: Vec<DiffWarning>,
}

impl DiffResult {
    /// Statements rendered for one phase.
    #[must_use]
    pub fn phase_statements(&self, phase: Phase) -> &[String] {
        match phase {
            Phase::CreateTables => &self.tables_to_create,
            Phase::AddColumns => &self.columns_to_add,
            Phase::DropForeignKeys => &self.foreign_keys_to_drop,
            Phase::AddIndexes => &self.indexes_to_add,
            Phase::AddForeignKeys => &self.foreign_keys_to_add,
        }
    }

    fn phase_statements_mut(&mut self, phase: Phase) -> &mut Vec<String> {
        match phase {
            Phase::CreateTables => &mut self.tables_to_create,
            Phase::AddColumns => &mut self.columns_to_add,
            Phase::DropForeignKeys => &mut self.foreign_keys_to_drop,
            Phase::AddIndexes => &mut self.indexes_to_add,
            Phase::AddForeignKeys => &mut self.foreign_keys_to_add,
        }
    }

    /// Executable statements (banners excluded), in order.
    pub fn executable(&self) -> impl Iterator<Item = &str> {
        self.statements
            .iter()
            .map(String::as_str)
            .filter(|s| !s.starts_with("--"))
    }

    /// Whether nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Per-phase counts, derived without re-running the diff.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            dialect: self.dialect.clone(),
            tables_to_create: self.tables_to_create.len(),
            columns_to_add: self.columns_to_add.len(),
            foreign_keys_to_drop: self.foreign_keys_to_drop.len(),
            indexes_to_add: self.indexes_to_add.len(),
            foreign_keys_to_add: self.foreign_keys_to_add.len(),
            total_statements: self.executable().count(),
            warnings: self.warnings.len(),
        }
    }

    /// A runnable script: banners as comments, statements `;`-terminated.
    #[must_use]
    pub fn to_script(&self) -> String {
        let mut script = String::new();
        for statement in &self.statements {
            if statement.starts_with("--") {
                if !script.is_empty() {
                    script.push('\n');
                }
                script.push_str(statement);
            } else {
                script.push_str(statement);
                script.push(';');
            }
            script.push('\n');
        }
        script
    }
}

/// Counts per phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub dialect: String,
    pub tables_to_create: usize,
    pub columns_to_add: usize,
    pub foreign_keys_to_drop: usize,
    pub indexes_to_add: usize,
    pub foreign_keys_to_add: usize,
    /// Executable statements across all phases.
    pub total_statements: usize,
    pub warnings: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Schema diff ({})", self.dialect)?;
        let rows = [
            (Phase::CreateTables, self.tables_to_create),
            (Phase::AddColumns, self.columns_to_add),
            (Phase::DropForeignKeys, self.foreign_keys_to_drop),
            (Phase::AddIndexes, self.indexes_to_add),
            (Phase::AddForeignKeys, self.foreign_keys_to_add),
        ];
        for (phase, count) in rows {
            writeln!(f, "  [{}/5] {:<28} {count}", phase.number(), phase.title())?;
        }
        writeln!(f, "  Total statements: {}", self.total_statements)?;
        write!(f, "  Warnings: {}", self.warnings)
    }
}

/// Diffs `entities` against `live` and renders the result with `generator`.
#[must_use]
pub fn generate_diff_ddl(
    entities: &[DeclaredEntity],
    live: &LiveSchema,
    policy: &DiffPolicy,
    generator: &DdlGenerator,
) -> DiffResult {
    let _span = info_span!("diff", dialect = generator.dialect_id()).entered();

    let resolution = resolve::resolve(entities);
    let ctx = DiffContext::new(&resolution.tables, live, policy);

    let categories: [(Phase, CategoryDiff); 5] = [
        (Phase::CreateTables, diff_tables(&ctx)),
        (Phase::AddColumns, diff_columns(&ctx)),
        (Phase::DropForeignKeys, diff_drop_foreign_keys(&ctx)),
        (Phase::AddIndexes, diff_indexes(&ctx)),
        (Phase::AddForeignKeys, diff_foreign_keys(&ctx)),
    ];

    let mut result = DiffResult {
        dialect: generator.dialect_id().to_string(),
        warnings: resolution.warnings,
        ..DiffResult::default()
    };

    for (phase, category) in categories {
        let mut rendered = Vec::new();
        for change in &category.changes {
            debug_assert_eq!(change.phase(), phase);
            for statement in generator.render_change(change) {
                debug!(phase = %phase, %statement, "Rendered statement");
                rendered.push(statement);
            }
        }
        if !rendered.is_empty() {
            result.statements.push(phase.banner(rendered.len()));
            result.statements.extend(rendered.iter().cloned());
        }
        *result.phase_statements_mut(phase) = rendered;
        result.changes.extend(category.changes);
        result.warnings.extend(category.warnings);
    }

    for warning in &result.warnings {
        warn!(%warning, "Diff warning");
    }
    let summary = result.summary();
    info!(
        tables = summary.tables_to_create,
        columns = summary.columns_to_add,
        dropped_foreign_keys = summary.foreign_keys_to_drop,
        indexes = summary.indexes_to_add,
        foreign_keys = summary.foreign_keys_to_add,
        warnings = summary.warnings,
        "Diff complete"
    );
    result
}

/// Acquires the declared model and live snapshot, then diffs them.
///
/// Provider failures are returned before any diffing happens.
pub fn reconcile<M, S>(
    model: &M,
    snapshot: &S,
    policy: &DiffPolicy,
    generator: &DdlGenerator,
) -> Result<DiffResult>
where
    M: ModelProvider + ?Sized,
    S: SnapshotProvider + ?Sized,
{
    let entities = model.declared_model()?;
    source::ensure_unique_tables(&entities)?;
    let live = snapshot.live_snapshot()?;
    info!(
        entities = entities.len(),
        live_tables = live.tables.len(),
        "Inputs acquired"
    );
    Ok(generate_diff_ddl(&entities, &live, policy, generator))
}
