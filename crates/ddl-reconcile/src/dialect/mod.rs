//! Database dialect strategies.
//!
//! Each dialect owns a static type-mapping table and knows how to render
//! DDL for its engine. Most of the rendering is shared through default
//! methods; dialects override the places where their syntax differs.

mod mysql;
mod postgres;
pub mod registry;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use registry::DialectRegistry;

use crate::diff::SchemaChange;
use crate::model::{ForeignKeyDefinition, IndexDefinition};
use crate::resolve::{ColumnDefinition, TableDefinition};

/// Maps one logical type to its SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRule {
    /// Logical type name, matched case-insensitively.
    pub logical: &'static str,
    /// SQL type used when no size is supplied.
    pub sql: &'static str,
    /// Base name a supplied size is appended to. `None` means the type takes
    /// no size and a supplied one is ignored.
    pub sized: Option<&'static str>,
}

impl TypeRule {
    /// A fixed-size type.
    #[must_use]
    pub const fn fixed(logical: &'static str, sql: &'static str) -> Self {
        Self {
            logical,
            sql,
            sized: None,
        }
    }

    /// A type that accepts a length or precision.
    #[must_use]
    pub const fn sized(logical: &'static str, sql: &'static str, base: &'static str) -> Self {
        Self {
            logical,
            sql,
            sized: Some(base),
        }
    }
}

/// Strips a built-in size suffix: `VARCHAR(255)` becomes `VARCHAR`.
fn strip_size(sql: &str) -> &str {
    sql.split_once('(').map_or(sql, |(base, _)| base.trim_end())
}

fn with_size(base: &str, precision: u32, scale: Option<u32>) -> String {
    match scale {
        Some(scale) => format!("{base}({precision},{scale})"),
        None => format!("{base}({precision})"),
    }
}

/// Escapes a string literal.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Per-engine DDL rendering.
pub trait DialectStrategy: Send + Sync {
    /// Engine identifier, upper case (`MYSQL`, `POSTGRES`).
    fn id(&self) -> &'static str;

    /// Static logical-to-SQL type table.
    fn type_rules(&self) -> &'static [TypeRule];

    /// Type used for logical types with no rule.
    fn default_type(&self) -> &'static str;

    /// Keyword appended to auto-increment columns, if the engine has one.
    fn auto_increment_keyword(&self) -> Option<&'static str> {
        None
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Maps a logical type to an SQL type name.
    ///
    /// A supplied precision (and scale) is applied after substitution. It is
    /// also applied when the logical type has no rule and fell back to the
    /// default type.
    fn column_type_name(
        &self,
        logical: &str,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> String {
        let rule = self
            .type_rules()
            .iter()
            .find(|r| r.logical.eq_ignore_ascii_case(logical));
        match (rule, precision) {
            (Some(rule), None) => rule.sql.to_string(),
            (Some(rule), Some(precision)) => match rule.sized {
                Some(base) => with_size(base, precision, scale),
                None => rule.sql.to_string(),
            },
            (None, None) => self.default_type().to_string(),
            (None, Some(precision)) => {
                with_size(strip_size(self.default_type()), precision, scale)
            }
        }
    }

    /// SQL type for a concrete column.
    fn column_sql_type(&self, column: &ColumnDefinition) -> String {
        self.column_type_name(&column.logical_type, column.length, column.scale)
    }

    /// Inline comment clause for a column, if the engine supports one.
    fn inline_comment(&self, _comment: &str) -> Option<String> {
        None
    }

    /// Text appended after the closing parenthesis of CREATE TABLE.
    fn table_options(&self, _table: &TableDefinition) -> String {
        String::new()
    }

    /// Renders one column definition. `inline_primary_key` is set when the
    /// table has a single-column primary key declared on the column itself.
    fn column_definition(&self, column: &ColumnDefinition, inline_primary_key: bool) -> String {
        let inline_pk = inline_primary_key && column.primary_key;
        let mut parts = vec![
            self.quote_identifier(&column.name),
            self.column_sql_type(column),
        ];
        if !column.nullable && !inline_pk {
            parts.push("NOT NULL".to_string());
        }
        if column.auto_increment {
            if let Some(keyword) = self.auto_increment_keyword() {
                parts.push(keyword.to_string());
            }
        }
        if inline_pk {
            parts.push("PRIMARY KEY".to_string());
        }
        if let Some(clause) = column.comment.as_deref().and_then(|c| self.inline_comment(c)) {
            parts.push(clause);
        }
        parts.join(" ")
    }

    /// CREATE TABLE, plus any statements the engine needs to complete it.
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
        vec![format!(
            "CREATE TABLE {} (\n  {}\n){}",
            self.quote_identifier(&table.name),
            defs.join(",\n  "),
            self.table_options(table)
        )]
    }

    /// DROP TABLE.
    fn generate_drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote_identifier(table))
    }

    /// ALTER TABLE ... ADD COLUMN, plus any follow-up statements.
    fn generate_add_column(&self, table: &str, column: &ColumnDefinition) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column, true)
        )]
    }

    /// ALTER TABLE ... DROP COLUMN.
    fn generate_drop_column(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY.
    fn generate_add_foreign_key(&self, table: &str, fk: &ForeignKeyDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(table),
            self.quote_identifier(&fk.resolved_name(table)),
            self.quote_identifier(&fk.column),
            self.quote_identifier(&fk.references_table),
            self.quote_identifier(&fk.references_column)
        )
    }

    /// Drops a foreign key constraint by name.
    fn generate_drop_foreign_key(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }

    /// CREATE INDEX.
    fn generate_create_index(&self, table: &str, index: &IndexDefinition) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.resolved_name(table)),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    /// Statements that set the table and column comments of `table`.
    fn generate_add_comment(&self, table: &TableDefinition) -> Vec<String>;

    /// Full schema for a set of tables: every CREATE TABLE first, then every
    /// index, then every foreign key.
    fn generate_schema(&self, tables: &[TableDefinition]) -> Vec<String> {
        let mut statements: Vec<String> = tables
            .iter()
            .flat_map(|t| self.generate_create_table(t))
            .collect();
        for table in tables {
            for index in &table.indexes {
                statements.push(self.generate_create_index(&table.name, index));
            }
        }
        for table in tables {
            for fk in &table.foreign_keys {
                statements.push(self.generate_add_foreign_key(&table.name, fk));
            }
        }
        statements
    }

    /// Renders a structured change.
    fn render_change(&self, change: &SchemaChange) -> Vec<String> {
        match change {
            SchemaChange::CreateTable(table) => self.generate_create_table(table),
            SchemaChange::AddColumn { table, column } => self.generate_add_column(table, column),
            SchemaChange::DropForeignKey { table, name } => {
                vec![self.generate_drop_foreign_key(table, name)]
            }
            SchemaChange::CreateIndex { table, index } => {
                vec![self.generate_create_index(table, index)]
            }
            SchemaChange::AddForeignKey { table, foreign_key } => {
                vec![self.generate_add_foreign_key(table, foreign_key)]
            }
        }
    }
}
