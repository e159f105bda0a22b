//! PostgreSQL dialect.
//!
//! PostgreSQL has no inline comments, so table and column comments are
//! emitted as separate `COMMENT ON` statements after the DDL they belong to.
//! Auto-increment keys use the SERIAL family of types.

use crate::model::{IndexDefinition, IndexType};
use crate::resolve::{ColumnDefinition, TableDefinition};

use super::{quote_literal, DialectStrategy, TypeRule};

const TYPE_RULES: &[TypeRule] = &[
    TypeRule::sized("String", "TEXT", "VARCHAR"),
    TypeRule::fixed("Text", "TEXT"),
    TypeRule::sized("Char", "CHAR(1)", "CHAR"),
    TypeRule::fixed("Integer", "INTEGER"),
    TypeRule::fixed("Long", "BIGINT"),
    TypeRule::fixed("Short", "SMALLINT"),
    TypeRule::fixed("Byte", "SMALLINT"),
    TypeRule::fixed("Boolean", "BOOLEAN"),
    TypeRule::fixed("Float", "REAL"),
    TypeRule::fixed("Double", "DOUBLE PRECISION"),
    TypeRule::sized("Decimal", "NUMERIC", "NUMERIC"),
    TypeRule::fixed("Date", "DATE"),
    TypeRule::fixed("Time", "TIME"),
    TypeRule::fixed("DateTime", "TIMESTAMP"),
    TypeRule::fixed("Timestamp", "TIMESTAMPTZ"),
    TypeRule::fixed("Uuid", "UUID"),
    TypeRule::fixed("Json", "JSONB"),
    TypeRule::fixed("Bytes", "BYTEA"),
];

/// PostgreSQL-family dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn comment_on_table(&self, table: &str, comment: &str) -> String {
        format!(
            "COMMENT ON TABLE {} IS {}",
            self.quote_identifier(table),
            quote_literal(comment)
        )
    }

    fn comment_on_column(&self, table: &str, column: &str, comment: &str) -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            quote_literal(comment)
        )
    }
}

impl DialectStrategy for PostgresDialect {
    fn id(&self) -> &'static str {
        "POSTGRES"
    }

    fn type_rules(&self) -> &'static [TypeRule] {
        TYPE_RULES
    }

    fn default_type(&self) -> &'static str {
        "TEXT"
    }

    fn column_sql_type(&self, column: &ColumnDefinition) -> String {
        let sql_type = self.column_type_name(&column.logical_type, column.length, column.scale);
        if !column.auto_increment {
            return sql_type;
        }
        let serial = match sql_type.as_str() {
            "BIGINT" => Some("BIGSERIAL"),
            "SMALLINT" => Some("SMALLSERIAL"),
            "INTEGER" => Some("SERIAL"),
            _ => None,
        };
        serial.map_or(sql_type, str::to_string)
    }

    fn generate_create_table(&self, table: &TableDefinition) -> Vec<String> {
        let pk = table.primary_key();
        let inline = pk.len() == 1;
        let mut defs: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c, inline))
            .collect();
        if pk.len() > 1 {
            let quoted: Vec<String> = pk.iter().map(|c| self.quote_identifier(&c.name)).collect();
            defs.push(format!("PRIMARY KEY ({})", quoted.join(", ")));
        }
        let mut statements = vec![format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_identifier(&table.name),
            defs.join(",\n  ")
        )];
        statements.extend(self.generate_add_comment(table));
        statements
    }

    fn generate_add_column(&self, table: &str, column: &ColumnDefinition) -> Vec<String> {
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column, true)
        )];
        if let Some(comment) = &column.comment {
            statements.push(self.comment_on_column(table, &column.name, comment));
        }
        statements
    }

    fn generate_create_index(&self, table: &str, index: &IndexDefinition) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        let using = match index.index_type {
            IndexType::BTree => "",
            IndexType::Hash => " USING HASH",
            IndexType::FullText => " USING GIN",
        };
        format!(
            "CREATE {}INDEX {} ON {}{using} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.resolved_name(table)),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    fn generate_add_comment(&self, table: &TableDefinition) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(comment) = &table.comment {
            statements.push(self.comment_on_table(&table.name, comment));
        }
        for column in &table.columns {
            if let Some(comment) = &column.comment {
                statements.push(self.comment_on_column(&table.name, &column.name, comment));
            }
        }
        statements
    }
}
