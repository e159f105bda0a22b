//! Integration tests for the reconciliation pipeline.
//!
//! These tests build declared models and live snapshots, run the full
//! diff, and check the rendered statements, their ordering, and that
//! replaying a diff converges.

use ddl_reconcile::prelude::*;

fn postgres() -> DdlGenerator {
    DdlGenerator::new(PostgresDialect::new())
}

fn mysql() -> DdlGenerator {
    DdlGenerator::new(MySqlDialect::new())
}

fn position(statements: &[String], needle: &str) -> Vec<usize> {
    statements
        .iter()
        .enumerate()
        .filter(|(_, s)| s.contains(needle))
        .map(|(i, _)| i)
        .collect()
}

// =============================================================================
// Model fixtures
// =============================================================================

fn order() -> DeclaredEntity {
    DeclaredEntity::new("Order")
        .field(DeclaredField::new("id", "Long").primary_key())
        .field(DeclaredField::new("amount", "Decimal"))
        .field(DeclaredField::new("status", "String"))
}

fn dept() -> DeclaredEntity {
    DeclaredEntity::new("Dept")
        .field(DeclaredField::new("id", "Long").primary_key().auto_increment())
        .field(DeclaredField::new("name", "String").length(64).not_null())
}

fn user() -> DeclaredEntity {
    DeclaredEntity::new("User")
        .field(DeclaredField::new("id", "Long").primary_key().auto_increment())
        .field(DeclaredField::new("email", "String").length(128).not_null())
        .field(DeclaredField::to_one("dept", "Dept"))
        .field(DeclaredField::new("createTime", "DateTime"))
        .field(DeclaredField::new("displayName", "String").transient())
        .field(DeclaredField::many_to_many(
            "roles",
            "Role",
            ManyToManyDescriptor::owning(),
        ))
        .index(IndexDefinition::new(["email"]).unique())
}

fn role() -> DeclaredEntity {
    DeclaredEntity::new("Role")
        .field(DeclaredField::new("id", "Long").primary_key().auto_increment())
        .field(DeclaredField::new("code", "String").length(32))
        .field(DeclaredField::many_to_many(
            "users",
            "User",
            ManyToManyDescriptor::inverse(),
        ))
}

fn model() -> Vec<DeclaredEntity> {
    vec![user(), dept(), role()]
}

// =============================================================================
// Example scenarios
// =============================================================================

#[test]
fn test_new_table_against_empty_snapshot() {
    let result = generate_diff_ddl(
        &[order()],
        &LiveSchema::new(),
        &DiffPolicy::default(),
        &postgres(),
    );

    assert_eq!(result.tables_to_create.len(), 1);
    let create = &result.tables_to_create[0];
    assert!(create.starts_with("CREATE TABLE \"order\""));
    assert!(create.contains("\"amount\" NUMERIC"));
    assert!(create.contains("\"status\" TEXT"));
    assert!(result.columns_to_add.is_empty());
    assert!(result.indexes_to_add.is_empty());
    assert!(result.foreign_keys_to_add.is_empty());
    assert!(result.foreign_keys_to_drop.is_empty());
}

#[test]
fn test_missing_column_on_existing_table() {
    let live = LiveSchema::new().table(
        LiveTable::new("order")
            .column(LiveColumn::new("id", "bigint").not_null())
            .column(LiveColumn::new("amount", "numeric")),
    );
    let result = generate_diff_ddl(&[order()], &live, &DiffPolicy::default(), &postgres());

    assert!(result.tables_to_create.is_empty());
    assert_eq!(
        result.columns_to_add,
        vec!["ALTER TABLE \"order\" ADD COLUMN \"status\" TEXT"]
    );
}

#[test]
fn test_bidirectional_many_to_many_yields_one_junction() {
    let scan = scan(&model());
    assert_eq!(scan.tables.len(), 1);
    assert_eq!(scan.tables[0].table_name, "role_user");

    let result = generate_diff_ddl(
        &model(),
        &LiveSchema::new(),
        &DiffPolicy::default(),
        &postgres(),
    );
    assert_eq!(position(&result.tables_to_create, "CREATE TABLE \"role_user\"").len(), 1);
}

#[test]
fn test_foreign_key_add_and_drop_ordering() {
    let live = LiveSchema::new()
        .table(
            LiveTable::new("user")
                .column(LiveColumn::new("id", "bigint"))
                .column(LiveColumn::new("email", "varchar"))
                .column(LiveColumn::new("dept_id", "bigint"))
                .index(LiveIndex::new("uk_user_email", ["email"]).unique())
                .foreign_key(LiveForeignKey::new("fk_user_team", "team_id", "team", "id")),
        )
        .table(
            LiveTable::new("dept")
                .column(LiveColumn::new("id", "bigint"))
                .column(LiveColumn::new("name", "varchar")),
        );
    let entities = vec![user(), dept()];
    let policy = DiffPolicy::new().allow_dropping_foreign_keys(true);
    let result = generate_diff_ddl(&entities, &live, &policy, &mysql());

    assert_eq!(
        result.foreign_keys_to_add,
        vec!["ALTER TABLE `user` ADD CONSTRAINT `fk_user_dept_id` FOREIGN KEY (`dept_id`) REFERENCES `dept` (`id`)"]
    );
    assert_eq!(
        result.foreign_keys_to_drop,
        vec!["ALTER TABLE `user` DROP FOREIGN KEY `fk_user_team`"]
    );

    let drop = position(&result.statements, "DROP FOREIGN KEY");
    let add = position(&result.statements, "ADD CONSTRAINT");
    assert!(drop[0] < add[0]);
}

#[test]
fn test_drop_is_off_by_default() {
    let live = LiveSchema::new().table(
        LiveTable::new("order")
            .column(LiveColumn::new("id", "bigint"))
            .column(LiveColumn::new("amount", "numeric"))
            .column(LiveColumn::new("status", "text"))
            .foreign_key(LiveForeignKey::new("fk_order_user", "user_id", "user", "id")),
    );
    let result = generate_diff_ddl(&[order()], &live, &DiffPolicy::default(), &postgres());
    assert!(result.is_empty());
}

#[test]
fn test_unsupported_dialect() {
    let registry = DialectRegistry::with_builtins();
    let err = DdlGenerator::for_database("ORACLE", &registry).unwrap_err();
    match err {
        ReconcileError::UnsupportedDialect {
            requested,
            supported,
        } => {
            assert_eq!(requested, "ORACLE");
            assert_eq!(supported, vec!["MYSQL".to_string(), "POSTGRES".to_string()]);
        }
        other => panic!("Expected UnsupportedDialect, got {other:?}"),
    }
}

// =============================================================================
// Cross-cutting properties
// =============================================================================

#[test]
fn test_phase_ordering_in_full_diff() {
    let live = LiveSchema::new().table(
        LiveTable::new("user")
            .column(LiveColumn::new("id", "bigint"))
            .foreign_key(LiveForeignKey::new("fk_user_org", "org_id", "org", "id")),
    );
    let policy = DiffPolicy::new().allow_dropping_foreign_keys(true);
    let result = generate_diff_ddl(&model(), &live, &policy, &postgres());
    let statements = &result.statements;

    let creates = position(statements, "CREATE TABLE");
    let columns = position(statements, "ADD COLUMN");
    let drops = position(statements, "DROP CONSTRAINT");
    let indexes = position(statements, "INDEX");
    let adds = position(statements, "ADD CONSTRAINT");

    assert!(!creates.is_empty() && !columns.is_empty());
    assert!(!drops.is_empty() && !indexes.is_empty() && !adds.is_empty());
    assert!(creates.iter().max() < columns.iter().min());
    assert!(columns.iter().max() < drops.iter().min());
    assert!(drops.iter().max() < indexes.iter().min());
    assert!(indexes.iter().max() < adds.iter().min());

    let banners: Vec<&String> = statements.iter().filter(|s| s.starts_with("--")).collect();
    assert_eq!(banners.len(), 5);
    assert!(banners[0].starts_with("-- [1/5]"));
    assert!(banners[4].starts_with("-- [5/5]"));
}

#[test]
fn test_audit_columns_never_added() {
    let live = LiveSchema::new()
        .table(LiveTable::new("user").column(LiveColumn::new("email", "text")));
    let result = generate_diff_ddl(
        &[user(), dept()],
        &live,
        &DiffPolicy::default(),
        &postgres(),
    );

    assert!(result.columns_to_add.iter().all(|s| !s.contains("create_time")));
    assert!(result.columns_to_add.iter().all(|s| !s.contains("\"id\"")));
    assert!(result.columns_to_add.iter().any(|s| s.contains("\"dept_id\" BIGINT")));
    assert!(result.columns_to_add.iter().all(|s| !s.contains("display_name")));
}

#[test]
fn test_diff_is_deterministic() {
    let live = LiveSchema::new()
        .table(LiveTable::new("dept").column(LiveColumn::new("id", "bigint")));
    let policy = DiffPolicy::default();
    let first = generate_diff_ddl(&model(), &live, &policy, &mysql());
    let second = generate_diff_ddl(&model(), &live, &policy, &mysql());
    assert_eq!(first.statements, second.statements);
    assert_eq!(first.to_script(), second.to_script());
}

#[test]
fn test_replayed_diff_converges() {
    let live = LiveSchema::new()
        .table(
            LiveTable::new("user")
                .column(LiveColumn::new("id", "bigint"))
                .foreign_key(LiveForeignKey::new("fk_user_org", "org_id", "org", "id")),
        )
        .table(LiveTable::new("dept").without_index_reader());
    let policy = DiffPolicy::new().allow_dropping_foreign_keys(true);

    for generator in [postgres(), mysql()] {
        let first = generate_diff_ddl(&model(), &live, &policy, &generator);
        assert!(!first.is_empty());

        let replayed = apply_changes(&live, &first.changes, generator.dialect()).unwrap();
        let second = generate_diff_ddl(&model(), &replayed, &policy, &generator);
        assert!(second.is_empty(), "{:?}", second.statements);
    }
}

#[test]
fn test_summary_counts_match_lists() {
    let result = generate_diff_ddl(
        &model(),
        &LiveSchema::new(),
        &DiffPolicy::default(),
        &postgres(),
    );
    let summary = result.summary();
    assert_eq!(summary.tables_to_create, 4);
    assert_eq!(summary.indexes_to_add, 1);
    assert_eq!(summary.foreign_keys_to_add, 3);
    assert_eq!(summary.total_statements, result.executable().count());

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["dialect"], "POSTGRES");
    assert_eq!(json["tables_to_create"], 4);
}

#[test]
fn test_unresolved_relationships_are_warnings() {
    let entities = vec![DeclaredEntity::new("Invoice")
        .field(DeclaredField::new("id", "Long").primary_key())
        .field(DeclaredField::to_one("customer", "Customer"))
        .field(DeclaredField::many_to_many(
            "tags",
            "Tag",
            ManyToManyDescriptor::owning(),
        ))];
    let result = generate_diff_ddl(
        &entities,
        &LiveSchema::new(),
        &DiffPolicy::default(),
        &postgres(),
    );

    assert_eq!(result.tables_to_create.len(), 1);
    assert!(result.tables_to_create[0].contains("\"customer_id\" BIGINT"));
    assert!(result.foreign_keys_to_add.is_empty());
    assert_eq!(result.warnings.len(), 2);
}

#[test]
fn test_reconcile_propagates_provider_errors() {
    struct Unreachable;

    impl SnapshotProvider for Unreachable {
        fn live_snapshot(&self) -> Result<LiveSchema> {
            Err(ReconcileError::connection("jdbc:mysql://db", "connection refused"))
        }
    }

    let err = reconcile(&model(), &Unreachable, &DiffPolicy::default(), &postgres()).unwrap_err();
    assert!(matches!(err, ReconcileError::Connection { .. }));
}

#[test]
fn test_reconcile_rejects_duplicate_tables_from_any_provider() {
    struct Harvested(Vec<DeclaredEntity>);

    impl ModelProvider for Harvested {
        fn declared_model(&self) -> Result<Vec<DeclaredEntity>> {
            Ok(self.0.clone())
        }
    }

    let model = Harvested(vec![order(), DeclaredEntity::new("Purchase").table("order")]);
    let err = reconcile(
        &model,
        &LiveSchema::new(),
        &DiffPolicy::default(),
        &postgres(),
    )
    .unwrap_err();
    assert!(matches!(err, ReconcileError::DuplicateTable { ref table, .. } if table == "order"));

    let err = reconcile(
        &vec![order(), DeclaredEntity::new("Purchase").table("order")],
        &LiveSchema::new(),
        &DiffPolicy::default(),
        &postgres(),
    )
    .unwrap_err();
    assert!(matches!(err, ReconcileError::DuplicateTable { .. }));
}
