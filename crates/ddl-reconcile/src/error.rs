//! Error types for the reconciliation engine.

use std::fmt;

use serde::Serialize;

/// Fatal errors. Any of these aborts the whole diff.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The live snapshot (or declared model) provider could not be reached.
    #[error("Cannot reach {source_name}: {message}")]
    Connection {
        /// Which provider failed (a path, a connection label, ...).
        source_name: String,
        /// Underlying failure.
        message: String,
    },

    /// Snapshot or declared-model data is malformed.
    #[error("Malformed metadata in {context}: {message}")]
    MetadataParse {
        /// Where the bad data came from (entity, table, file).
        context: String,
        /// What is wrong with it.
        message: String,
    },

    /// Two declared entities resolve to the same table name.
    #[error("Table '{table}' is declared by both '{first}' and '{second}'")]
    DuplicateTable {
        /// The clashing table name.
        table: String,
        /// Entity that claimed the name first.
        first: String,
        /// Entity that claimed it again.
        second: String,
    },

    /// The requested database engine has no registered dialect.
    #[error("Unsupported database '{requested}', supported: [{}]", .supported.join(", "))]
    UnsupportedDialect {
        /// The identifier that was asked for.
        requested: String,
        /// Identifiers registered at the time of the lookup.
        supported: Vec<String>,
    },

    /// A structured change could not be replayed onto a snapshot.
    #[error("Invalid schema state: {0}")]
    InvalidState(String),

    /// IO error (writing scripts and reports).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Creates a `Connection` error.
    pub fn connection(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Connection {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Creates a `MetadataParse` error.
    pub fn metadata(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MetadataParse {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Non-fatal conditions. The affected item is skipped and the rest of the
/// diff proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffWarning {
    /// A many-to-many field whose target entity could not be resolved.
    UnresolvedRelationship {
        /// Entity declaring the field.
        entity: String,
        /// The relationship field.
        field: String,
        /// The type name that failed to resolve, if any was given.
        target: Option<String>,
    },

    /// A relationship-to-one field whose target entity is unknown. The join
    /// column is still diffed but no foreign key is derived.
    UnresolvedForeignKeyTarget {
        /// Table owning the join column.
        table: String,
        /// The relationship field.
        field: String,
        /// The unresolved target type.
        target: String,
    },

    /// A declared index matched one live index by name and a different one
    /// by shape.
    AmbiguousIndexMatch {
        /// Table name.
        table: String,
        /// Declared index name.
        index: String,
        /// Live index matched by name.
        by_name: String,
        /// Live index matched by columns and type.
        by_shape: String,
    },

    /// A live foreign key with no declared counterpart that has no
    /// constraint name and therefore cannot be dropped.
    UnnamedLiveForeignKey {
        /// Table name.
        table: String,
        /// Source column of the live key.
        column: String,
    },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedRelationship {
                entity,
                field,
                target,
            } => match target {
                Some(target) => write!(
                    f,
                    "{entity}.{field}: many-to-many target '{target}' is not a declared entity"
                ),
                None => write!(f, "{entity}.{field}: many-to-many target type is unknown"),
            },
            Self::UnresolvedForeignKeyTarget {
                table,
                field,
                target,
            } => write!(
                f,
                "{table}.{field}: relationship target '{target}' is not a declared entity, no foreign key derived"
            ),
            Self::AmbiguousIndexMatch {
                table,
                index,
                by_name,
                by_shape,
            } => write!(
                f,
                "{table}: index '{index}' matches '{by_name}' by name and '{by_shape}' by columns"
            ),
            Self::UnnamedLiveForeignKey { table, column } => write!(
                f,
                "{table}.{column}: obsolete foreign key has no constraint name and cannot be dropped"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_dialect_lists_supported() {
        let err = ReconcileError::UnsupportedDialect {
            requested: "ORACLE".to_string(),
            supported: vec!["MYSQL".to_string(), "POSTGRES".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unsupported database 'ORACLE', supported: [MYSQL, POSTGRES]"
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = DiffWarning::UnnamedLiveForeignKey {
            table: "user".to_string(),
            column: "dept_id".to_string(),
        };
        assert!(warning.to_string().starts_with("user.dept_id:"));
    }
}
