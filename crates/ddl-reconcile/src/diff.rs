//! Schema differ.
//!
//! Each category is diffed by its own pure function over a [`DiffContext`].
//! The functions never look at each other's output; sequencing is the
//! orchestrator's job (see [`crate::plan`]).

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DiffWarning;
use crate::model::{ForeignKeyDefinition, IndexDefinition, IndexType};
use crate::policy::DiffPolicy;
use crate::resolve::{ColumnDefinition, TableDefinition};
use crate::snapshot::{LiveSchema, LiveTable};

/// Execution phase of a change. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// New tables.
    CreateTables,
    /// New columns on existing tables.
    AddColumns,
    /// Obsolete foreign keys.
    DropForeignKeys,
    /// Missing indexes.
    AddIndexes,
    /// Missing foreign keys.
    AddForeignKeys,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 5] = [
        Phase::CreateTables,
        Phase::AddColumns,
        Phase::DropForeignKeys,
        Phase::AddIndexes,
        Phase::AddForeignKeys,
    ];

    /// One-based position in the execution order.
    #[must_use]
    pub fn number(self) -> usize {
        self as usize + 1
    }

    /// Human-readable title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Phase::CreateTables => "Create tables",
            Phase::AddColumns => "Add columns",
            Phase::DropForeignKeys => "Drop obsolete foreign keys",
            Phase::AddIndexes => "Add indexes",
            Phase::AddForeignKeys => "Add foreign keys",
        }
    }

    /// Banner line introducing a phase with `count` statements.
    #[must_use]
    pub fn banner(self, count: usize) -> String {
        format!(
            "-- [{}/{}] {} ({count})",
            self.number(),
            Phase::ALL.len(),
            self.title()
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A structured schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SchemaChange {
    /// Create a table with all its columns.
    CreateTable(TableDefinition),
    /// Add a column to an existing table.
    AddColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Drop a live foreign key by constraint name.
    DropForeignKey { table: String, name: String },
    /// Create an index.
    CreateIndex {
        table: String,
        index: IndexDefinition,
    },
    /// Add a foreign key.
    AddForeignKey {
        table: String,
        foreign_key: ForeignKeyDefinition,
    },
}

impl SchemaChange {
    /// The phase this change runs in.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            SchemaChange::CreateTable(_) => Phase::CreateTables,
            SchemaChange::AddColumn { .. } => Phase::AddColumns,
            SchemaChange::DropForeignKey { .. } => Phase::DropForeignKeys,
            SchemaChange::CreateIndex { .. } => Phase::AddIndexes,
            SchemaChange::AddForeignKey { .. } => Phase::AddForeignKeys,
        }
    }

    /// Table the change applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            SchemaChange::CreateTable(table) => &table.name,
            SchemaChange::AddColumn { table, .. }
            | SchemaChange::DropForeignKey { table, .. }
            | SchemaChange::CreateIndex { table, .. }
            | SchemaChange::AddForeignKey { table, .. } => table,
        }
    }
}

/// Inputs shared by every differ function.
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    /// Desired tables, junction tables included.
    pub tables: &'a [TableDefinition],
    /// Live snapshot.
    pub live: &'a LiveSchema,
    /// Policy.
    pub policy: &'a DiffPolicy,
}

impl<'a> DiffContext<'a> {
    #[must_use]
    pub fn new(
        tables: &'a [TableDefinition],
        live: &'a LiveSchema,
        policy: &'a DiffPolicy,
    ) -> Self {
        Self {
            tables,
            live,
            policy,
        }
    }

    fn live_table(&self, name: &str) -> Option<&'a LiveTable> {
        self.live.get_table(name)
    }
}

/// Changes and warnings produced for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDiff {
    pub changes: Vec<SchemaChange>,
    pub warnings: Vec<DiffWarning>,
}

impl CategoryDiff {
    fn from_changes(changes: Vec<SchemaChange>) -> Self {
        Self {
            changes,
            warnings: Vec::new(),
        }
    }
}

/// Declared tables with no live table of the exact same name.
#[must_use]
pub fn diff_tables(ctx: &DiffContext<'_>) -> CategoryDiff {
    let changes = ctx
        .tables
        .iter()
        .filter(|t| ctx.live_table(&t.name).is_none())
        .map(|t| {
            debug!(table = %t.name, "Table missing");
            SchemaChange::CreateTable(t.clone())
        })
        .collect();
    CategoryDiff::from_changes(changes)
}

/// Declared columns missing from existing live tables, audit columns
/// excluded.
#[must_use]
pub fn diff_columns(ctx: &DiffContext<'_>) -> CategoryDiff {
    let mut changes = Vec::new();
    for table in ctx.tables {
        let Some(live) = ctx.live_table(&table.name) else {
            continue;
        };
        for column in &table.columns {
            if ctx.policy.is_audit_column(&column.name) || live.has_column(&column.name) {
                continue;
            }
            debug!(table = %table.name, column = %column.name, "Column missing");
            changes.push(SchemaChange::AddColumn {
                table: table.name.clone(),
                column: column.clone(),
            });
        }
    }
    CategoryDiff::from_changes(changes)
}

/// Declared indexes missing live. An index is present when a live index has
/// the same name, or the same sorted column set and type.
///
/// A live table without index information is treated as having no indexes,
/// so its declared indexes are all emitted. A declared index repeating the
/// name or shape of one already emitted for the table is emitted once.
#[must_use]
pub fn diff_indexes(ctx: &DiffContext<'_>) -> CategoryDiff {
    let mut result = CategoryDiff::default();
    if !ctx.policy.manage_indexes {
        return result;
    }
    for table in ctx.tables {
        let live_indexes = ctx.live_table(&table.name).map(LiveTable::indexes).unwrap_or_default();
        let mut emitted: Vec<(String, Vec<String>, IndexType)> = Vec::new();
        for index in &table.indexes {
            let name = index.resolved_name(&table.name);
            let columns = index.sorted_columns();
            let repeated = emitted.iter().any(|(n, c, t)| {
                n.eq_ignore_ascii_case(&name) || (*t == index.index_type && *c == columns)
            });
            if repeated {
                debug!(table = %table.name, index = %name, "Index already emitted");
                continue;
            }
            let by_name = live_indexes.iter().find(|l| l.name.eq_ignore_ascii_case(&name));
            let by_shape = live_indexes
                .iter()
                .find(|l| l.index_type == index.index_type && l.sorted_columns() == columns);

            match (by_name, by_shape) {
                (Some(named), Some(shaped)) if named.name != shaped.name => {
                    warn!(table = %table.name, index = %name, "Ambiguous index match");
                    result.warnings.push(DiffWarning::AmbiguousIndexMatch {
                        table: table.name.clone(),
                        index: name,
                        by_name: named.name.clone(),
                        by_shape: shaped.name.clone(),
                    });
                }
                (Some(_), _) | (_, Some(_)) => {}
                (None, None) => {
                    debug!(table = %table.name, index = %name, "Index missing");
                    emitted.push((name.clone(), columns, index.index_type));
                    result.changes.push(SchemaChange::CreateIndex {
                        table: table.name.clone(),
                        index: index.clone().named(name),
                    });
                }
            }
        }
    }
    result
}

/// Declared foreign keys with no live key linking the same columns.
#[must_use]
pub fn diff_foreign_keys(ctx: &DiffContext<'_>) -> CategoryDiff {
    if !ctx.policy.manage_foreign_keys {
        return CategoryDiff::default();
    }
    let mut changes = Vec::new();
    for table in ctx.tables {
        let live_keys = ctx
            .live_table(&table.name)
            .map(|t| t.foreign_keys.as_slice())
            .unwrap_or_default();
        for fk in &table.foreign_keys {
            let present = live_keys
                .iter()
                .any(|l| l.links(&fk.column, &fk.references_table, &fk.references_column));
            if !present {
                let name = fk.resolved_name(&table.name);
                debug!(table = %table.name, foreign_key = %name, "Foreign key missing");
                changes.push(SchemaChange::AddForeignKey {
                    table: table.name.clone(),
                    foreign_key: fk.clone().named(name),
                });
            }
        }
    }
    CategoryDiff::from_changes(changes)
}

/// Live foreign keys on declared tables with no declared counterpart.
///
/// Only runs when the policy allows dropping. Tables absent from the
/// declared model are left alone, and keys without a constraint name are
/// reported instead of dropped.
#[must_use]
pub fn diff_drop_foreign_keys(ctx: &DiffContext<'_>) -> CategoryDiff {
    let mut result = CategoryDiff::default();
    if !ctx.policy.drops_foreign_keys() {
        return result;
    }
    for table in ctx.tables {
        let Some(live) = ctx.live_table(&table.name) else {
            continue;
        };
        let mut dropped = BTreeSet::new();
        for live_fk in &live.foreign_keys {
            let declared = table.foreign_keys.iter().any(|fk| {
                live_fk.links(&fk.column, &fk.references_table, &fk.references_column)
            });
            if declared {
                continue;
            }
            match &live_fk.name {
                Some(name) => {
                    if dropped.insert(name.clone()) {
                        debug!(table = %table.name, foreign_key = %name, "Foreign key obsolete");
                        result.changes.push(SchemaChange::DropForeignKey {
                            table: table.name.clone(),
                            name: name.clone(),
                        });
                    }
                }
                None => {
                    warn!(
                        table = %table.name,
                        column = %live_fk.column,
                        "Obsolete foreign key has no name"
                    );
                    result.warnings.push(DiffWarning::UnnamedLiveForeignKey {
                        table: table.name.clone(),
                        column: live_fk.column.clone(),
                    });
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{LiveColumn, LiveForeignKey, LiveIndex};

    fn order_table() -> TableDefinition {
        TableDefinition::new("order")
            .column(ColumnDefinition::new("id", "Long").primary_key())
            .column(ColumnDefinition::new("amount", "Decimal"))
            .column(ColumnDefinition::new("status", "String"))
            .column(ColumnDefinition::new("create_time", "DateTime"))
    }

    fn live_order() -> LiveTable {
        LiveTable::new("order")
            .column(LiveColumn::new("id", "bigint").not_null())
            .column(LiveColumn::new("AMOUNT", "numeric"))
    }

    #[test]
    fn test_phase_banner() {
        assert_eq!(Phase::CreateTables.banner(2), "-- [1/5] Create tables (2)");
        assert_eq!(Phase::AddForeignKeys.banner(1), "-- [5/5] Add foreign keys (1)");
        assert!(Phase::DropForeignKeys < Phase::AddIndexes);
    }

    #[test]
    fn test_diff_tables_exact_match() {
        let tables = vec![order_table()];
        let policy = DiffPolicy::default();

        let empty = LiveSchema::new();
        let diff = diff_tables(&DiffContext::new(&tables, &empty, &policy));
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].phase(), Phase::CreateTables);

        let live = LiveSchema::new().table(LiveTable::new("order"));
        assert!(diff_tables(&DiffContext::new(&tables, &live, &policy)).changes.is_empty());

        let other_case = LiveSchema::new().table(LiveTable::new("ORDER"));
        assert_eq!(
            diff_tables(&DiffContext::new(&tables, &other_case, &policy)).changes.len(),
            1
        );
    }

    #[test]
    fn test_diff_columns_skips_audit_and_case() {
        let tables = vec![order_table()];
        let live = LiveSchema::new().table(live_order());
        let policy = DiffPolicy::default();
        let diff = diff_columns(&DiffContext::new(&tables, &live, &policy));

        assert_eq!(diff.changes.len(), 1);
        match &diff.changes[0] {
            SchemaChange::AddColumn { table, column } => {
                assert_eq!(table, "order");
                assert_eq!(column.name, "status");
            }
            other => panic!("Expected AddColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_columns_ignores_new_tables() {
        let tables = vec![order_table()];
        let live = LiveSchema::new();
        let policy = DiffPolicy::default();
        assert!(diff_columns(&DiffContext::new(&tables, &live, &policy)).changes.is_empty());
    }

    #[test]
    fn test_diff_indexes_by_name_or_shape() {
        let tables = vec![order_table()
            .index(IndexDefinition::new(["status"]))
            .index(IndexDefinition::new(["amount", "status"]).named("ix_amount_status"))
            .index(IndexDefinition::new(["create_time"]))];
        let live = LiveSchema::new().table(
            live_order()
                .index(LiveIndex::new("legacy_status", ["STATUS"]))
                .index(LiveIndex::new("ix_amount_status", ["amount"])),
        );
        let policy = DiffPolicy::default();
        let diff = diff_indexes(&DiffContext::new(&tables, &live, &policy));

        assert_eq!(diff.changes.len(), 1);
        match &diff.changes[0] {
            SchemaChange::CreateIndex { index, .. } => {
                assert_eq!(index.name.as_deref(), Some("idx_order_create_time"));
            }
            other => panic!("Expected CreateIndex, got {other:?}"),
        }
        assert!(diff.warnings.is_empty());
    }

    #[test]
    fn test_diff_indexes_repeated_declaration_emitted_once() {
        let tables = vec![order_table()
            .index(IndexDefinition::new(["status"]))
            .index(IndexDefinition::new(["status"]))
            .index(IndexDefinition::new(["status"]).named("ix_status_again"))];
        let live = LiveSchema::new().table(live_order());
        let policy = DiffPolicy::default();
        let diff = diff_indexes(&DiffContext::new(&tables, &live, &policy));

        assert_eq!(diff.changes.len(), 1);
        match &diff.changes[0] {
            SchemaChange::CreateIndex { index, .. } => {
                assert_eq!(index.name.as_deref(), Some("idx_order_status"));
            }
            other => panic!("Expected CreateIndex, got {other:?}"),
        }
    }

    #[test]
    fn test_diff_indexes_type_matters_for_shape() {
        let tables =
            vec![order_table().index(IndexDefinition::new(["status"]).index_type(IndexType::Hash))];
        let live =
            LiveSchema::new().table(live_order().index(LiveIndex::new("legacy", ["status"])));
        let policy = DiffPolicy::default();
        assert_eq!(diff_indexes(&DiffContext::new(&tables, &live, &policy)).changes.len(), 1);
    }

    #[test]
    fn test_diff_indexes_without_reader_over_generates() {
        let tables = vec![order_table().index(IndexDefinition::new(["status"]))];
        let live = LiveSchema::new().table(live_order().without_index_reader());
        let policy = DiffPolicy::default();
        assert_eq!(diff_indexes(&DiffContext::new(&tables, &live, &policy)).changes.len(), 1);

        let disabled = DiffPolicy::new().manage_indexes(false);
        assert!(diff_indexes(&DiffContext::new(&tables, &live, &disabled)).changes.is_empty());
    }

    #[test]
    fn test_diff_indexes_ambiguous_match() {
        let tables = vec![order_table().index(IndexDefinition::new(["status"]).named("ix_status"))];
        let live = LiveSchema::new().table(
            live_order()
                .index(LiveIndex::new("ix_status", ["amount"]))
                .index(LiveIndex::new("other", ["status"])),
        );
        let policy = DiffPolicy::default();
        let diff = diff_indexes(&DiffContext::new(&tables, &live, &policy));
        assert!(diff.changes.is_empty());
        assert_eq!(
            diff.warnings,
            vec![DiffWarning::AmbiguousIndexMatch {
                table: "order".to_string(),
                index: "ix_status".to_string(),
                by_name: "ix_status".to_string(),
                by_shape: "other".to_string(),
            }]
        );
    }

    fn user_table() -> TableDefinition {
        TableDefinition::new("user")
            .column(ColumnDefinition::new("id", "Long").primary_key())
            .column(ColumnDefinition::new("dept_id", "Long"))
            .foreign_key(ForeignKeyDefinition::new("dept_id", "dept", "id"))
    }

    #[test]
    fn test_diff_foreign_keys() {
        let tables = vec![user_table()];
        let live = LiveSchema::new().table(LiveTable::new("user"));
        let policy = DiffPolicy::default();
        let diff = diff_foreign_keys(&DiffContext::new(&tables, &live, &policy));
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].phase(), Phase::AddForeignKeys);

        let present = LiveSchema::new().table(
            LiveTable::new("user").foreign_key(LiveForeignKey::new("any", "DEPT_ID", "dept", "id")),
        );
        assert!(diff_foreign_keys(&DiffContext::new(&tables, &present, &policy))
            .changes
            .is_empty());

        let disabled = DiffPolicy::new().manage_foreign_keys(false);
        assert!(diff_foreign_keys(&DiffContext::new(&tables, &live, &disabled))
            .changes
            .is_empty());
    }

    #[test]
    fn test_diff_drop_foreign_keys_gated() {
        let tables = vec![user_table()];
        let live = LiveSchema::new()
            .table(
                LiveTable::new("user")
                    .foreign_key(LiveForeignKey::new("fk_user_dept_id", "dept_id", "dept", "id"))
                    .foreign_key(LiveForeignKey::new("fk_user_team", "team_id", "team", "id")),
            )
            .table(
                LiveTable::new("audit_log")
                    .foreign_key(LiveForeignKey::new("fk_log_user", "user_id", "user", "id")),
            );

        let default = DiffPolicy::default();
        assert!(diff_drop_foreign_keys(&DiffContext::new(&tables, &live, &default))
            .changes
            .is_empty());

        let allowed = DiffPolicy::new().allow_dropping_foreign_keys(true);
        let diff = diff_drop_foreign_keys(&DiffContext::new(&tables, &live, &allowed));
        assert_eq!(
            diff.changes,
            vec![SchemaChange::DropForeignKey {
                table: "user".to_string(),
                name: "fk_user_team".to_string(),
            }]
        );
    }

    #[test]
    fn test_unnamed_obsolete_key_is_reported() {
        let tables = vec![user_table()];
        let mut unnamed = LiveForeignKey::new("x", "team_id", "team", "id");
        unnamed.name = None;
        let live = LiveSchema::new().table(LiveTable::new("user").foreign_key(unnamed));
        let policy = DiffPolicy::new().allow_dropping_foreign_keys(true);
        let diff = diff_drop_foreign_keys(&DiffContext::new(&tables, &live, &policy));
        assert!(diff.changes.is_empty());
        assert_eq!(diff.warnings.len(), 1);
    }
}
