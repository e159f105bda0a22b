//! Schema-state replay.
//!
//! Applies structured changes to an owned copy of a live snapshot, producing
//! the snapshot the database would report after running the generated DDL.
//! Re-diffing against the replayed state is how idempotence is checked.

use crate::dialect::DialectStrategy;
use crate::diff::SchemaChange;
use crate::error::{ReconcileError, Result};
use crate::snapshot::{LiveColumn, LiveForeignKey, LiveIndex, LiveSchema, LiveTable};

/// A live snapshot that changes can be replayed onto.
#[derive(Debug, Default)]
pub struct SchemaState {
    schema: LiveSchema,
}

impl SchemaState {
    /// Starts from an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing snapshot.
    #[must_use]
    pub fn from_snapshot(schema: LiveSchema) -> Self {
        Self { schema }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn schema(&self) -> &LiveSchema {
        &self.schema
    }

    /// Consumes and returns the schema.
    #[must_use]
    pub fn into_schema(self) -> LiveSchema {
        self.schema
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut LiveTable> {
        self.schema
            .get_table_mut(name)
            .ok_or_else(|| ReconcileError::InvalidState(format!("Table '{name}' does not exist")))
    }

    /// Applies one change. Column types are rendered through `dialect`.
    pub fn apply_change(
        &mut self,
        change: &SchemaChange,
        dialect: &dyn DialectStrategy,
    ) -> Result<()> {
        match change {
            SchemaChange::CreateTable(table) => {
                if self.schema.get_table(&table.name).is_some() {
                    return Err(ReconcileError::InvalidState(format!(
                        "Table '{}' already exists",
                        table.name
                    )));
                }
                let mut live = LiveTable::new(&table.name);
                for column in &table.columns {
                    live.columns.push(LiveColumn {
                        name: column.name.clone(),
                        sql_type: dialect.column_sql_type(column),
                        nullable: column.nullable,
                    });
                }
                self.schema.insert(live);
            }

            SchemaChange::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.has_column(&column.name) {
                    return Err(ReconcileError::InvalidState(format!(
                        "Column '{}' already exists in table '{table}'",
                        column.name
                    )));
                }
                t.columns.push(LiveColumn {
                    name: column.name.clone(),
                    sql_type: dialect.column_sql_type(column),
                    nullable: column.nullable,
                });
            }

            SchemaChange::DropForeignKey { table, name } => {
                let t = self.table_mut(table)?;
                let idx = t
                    .foreign_keys
                    .iter()
                    .position(|fk| fk.name.as_deref() == Some(name.as_str()))
                    .ok_or_else(|| {
                        ReconcileError::InvalidState(format!(
                            "Foreign key '{name}' does not exist in table '{table}'"
                        ))
                    })?;
                t.foreign_keys.remove(idx);
            }

            SchemaChange::CreateIndex { table, index } => {
                let t = self.table_mut(table)?;
                t.indexes.get_or_insert_with(Vec::new).push(LiveIndex {
                    name: index.resolved_name(table),
                    columns: index.columns.clone(),
                    unique: index.unique,
                    index_type: index.index_type,
                });
            }

            SchemaChange::AddForeignKey { table, foreign_key } => {
                let t = self.table_mut(table)?;
                t.foreign_keys.push(LiveForeignKey {
                    name: Some(foreign_key.resolved_name(table)),
                    column: foreign_key.column.clone(),
                    references_table: foreign_key.references_table.clone(),
                    references_column: foreign_key.references_column.clone(),
                });
            }
        }
        Ok(())
    }

    /// Applies changes in order, stopping at the first invalid one.
    pub fn apply_changes(
        &mut self,
        changes: &[SchemaChange],
        dialect: &dyn DialectStrategy,
    ) -> Result<()> {
        for change in changes {
            self.apply_change(change, dialect)?;
        }
        Ok(())
    }
}

/// Replays `changes` onto a copy of `live`.
pub fn apply_changes(
    live: &LiveSchema,
    changes: &[SchemaChange],
    dialect: &dyn DialectStrategy,
) -> Result<LiveSchema> {
    let mut state = SchemaState::from_snapshot(live.clone());
    state.apply_changes(changes, dialect)?;
    Ok(state.into_schema())
}
