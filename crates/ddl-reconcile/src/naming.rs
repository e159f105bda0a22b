//! Database naming conventions.
//!
//! Declared models use language identifiers (`createTime`, `OrderItem`);
//! the database uses snake_case. Everything that compares a declared name
//! with a live one goes through [`convention_key`].

use convert_case::{Case, Casing};

/// Converts an identifier to the database naming convention.
#[must_use]
pub fn to_column_name(identifier: &str) -> String {
    identifier.to_case(Case::Snake)
}

/// Converts an entity type name to its default table name.
#[must_use]
pub fn to_table_name(identifier: &str) -> String {
    identifier.to_case(Case::Snake)
}

/// Default join column for a relationship field: `<field>_id`.
#[must_use]
pub fn join_column_name(field_identifier: &str) -> String {
    format!("{}_id", to_column_name(field_identifier))
}

/// Default junction endpoint column for a table: `<table>_id`.
#[must_use]
pub fn endpoint_column_name(table: &str) -> String {
    format!("{table}_id")
}

/// Canonical junction table name: both endpoint tables sorted and joined,
/// so either scan direction yields the same name.
#[must_use]
pub fn junction_table_name(a: &str, b: &str) -> String {
    let mut names = [a, b];
    names.sort_unstable();
    format!("{}_{}", names[0], names[1])
}

/// Case- and convention-insensitive comparison key.
///
/// `createTime`, `create_time` and `CREATE_TIME` all map to `create_time`.
#[must_use]
pub fn convention_key(name: &str) -> String {
    name.to_case(Case::Snake).to_ascii_lowercase()
}

/// Generated name for an unnamed index.
#[must_use]
pub fn index_name(table: &str, columns: &[String], unique: bool) -> String {
    let prefix = if unique { "uk" } else { "idx" };
    format!("{prefix}_{table}_{}", columns.join("_"))
}

/// Generated name for an unnamed foreign key constraint.
#[must_use]
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("fk_{table}_{column}")
}
