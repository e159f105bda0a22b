//! MySQL dialect.
//!
//! Comments are inline `COMMENT` clauses on columns and a `COMMENT=` table
//! option, foreign keys are dropped with `DROP FOREIGN KEY`.

use crate::model::{IndexDefinition, IndexType};
use crate::resolve::TableDefinition;

use super::{quote_literal, DialectStrategy, TypeRule};

const TYPE_RULES: &[TypeRule] = &[
    TypeRule::sized("String", "VARCHAR(255)", "VARCHAR"),
    TypeRule::fixed("Text", "TEXT"),
    TypeRule::sized("Char", "CHAR(1)", "CHAR"),
    TypeRule::fixed("Integer", "INT"),
    TypeRule::fixed("Long", "BIGINT"),
    TypeRule::fixed("Short", "SMALLINT"),
    TypeRule::fixed("Byte", "TINYINT"),
    TypeRule::fixed("Boolean", "TINYINT(1)"),
    TypeRule::fixed("Float", "FLOAT"),
    TypeRule::fixed("Double", "DOUBLE"),
    TypeRule::sized("Decimal", "DECIMAL(19,2)", "DECIMAL"),
    TypeRule::fixed("Date", "DATE"),
    TypeRule::fixed("Time", "TIME"),
    TypeRule::fixed("DateTime", "DATETIME"),
    TypeRule::fixed("Timestamp", "TIMESTAMP"),
    TypeRule::fixed("Uuid", "CHAR(36)"),
    TypeRule::fixed("Json", "JSON"),
    TypeRule::fixed("Bytes", "BLOB"),
];

/// MySQL-family dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl DialectStrategy for MySqlDialect {
    fn id(&self) -> &'static str {
        "MYSQL"
    }

    fn type_rules(&self) -> &'static [TypeRule] {
        TYPE_RULES
    }

    fn default_type(&self) -> &'static str {
        "VARCHAR(255)"
    }

    fn auto_increment_keyword(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn inline_comment(&self, comment: &str) -> Option<String> {
        Some(format!("COMMENT {}", quote_literal(comment)))
    }

    fn table_options(&self, table: &TableDefinition) -> String {
        table
            .comment
            .as_deref()
            .map(|c| format!(" COMMENT={}", quote_literal(c)))
            .unwrap_or_default()
    }

    fn generate_drop_foreign_key(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(table),
            self.quote_identifier(name)
        )
    }

    fn generate_create_index(&self, table: &str, index: &IndexDefinition) -> String {
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect();
        let kind = match (index.index_type, index.unique) {
            (IndexType::FullText, _) => "FULLTEXT ",
            (_, true) => "UNIQUE ",
            (_, false) => "",
        };
        let using = if index.index_type == IndexType::Hash {
            " USING HASH"
        } else {
            ""
        };
        format!(
            "CREATE {kind}INDEX {} ON {} ({}){using}",
            self.quote_identifier(&index.resolved_name(table)),
            self.quote_identifier(table),
            columns.join(", ")
        )
    }

    fn generate_add_comment(&self, table: &TableDefinition) -> Vec<String> {
        let quoted = self.quote_identifier(&table.name);
        let mut statements = Vec::new();
        if let Some(comment) = &table.comment {
            statements.push(format!("ALTER TABLE {quoted} COMMENT = {}", quote_literal(comment)));
        }
        // The key already exists on the table, so never restate PRIMARY KEY.
        for column in table.columns.iter().filter(|c| c.comment.is_some()) {
            statements.push(format!(
                "ALTER TABLE {quoted} MODIFY COLUMN {}",
                self.column_definition(column, false)
            ));
        }
        statements
    }
}
