//! Declared-model and live-snapshot providers.
//!
//! The engine consumes both inputs through these traits and never cares how
//! they were acquired. The file adapters here read JSON written by an
//! external harvester or metadata reader.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::model::DeclaredEntity;
use crate::snapshot::{LiveSchema, LiveTable};
use crate::source::{self, manifest::Manifest};

/// Supplies the declared schema model.
pub trait ModelProvider {
    /// Builds the declared model.
    fn declared_model(&self) -> Result<Vec<DeclaredEntity>>;
}

/// Supplies the live schema snapshot.
pub trait SnapshotProvider {
    /// Fetches the live snapshot.
    fn live_snapshot(&self) -> Result<LiveSchema>;
}

impl ModelProvider for Vec<DeclaredEntity> {
    fn declared_model(&self) -> Result<Vec<DeclaredEntity>> {
        source::ensure_unique_tables(self)?;
        Ok(self.clone())
    }
}

impl SnapshotProvider for LiveSchema {
    fn live_snapshot(&self) -> Result<LiveSchema> {
        Ok(self.clone())
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ReconcileError::connection(path.display().to_string(), e))
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
    serde_json::from_str(content)
        .map_err(|e| ReconcileError::metadata(path.display().to_string(), e))
}

/// Declared model read from a JSON manifest.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads and parses the manifest without building the model.
    pub fn load(&self) -> Result<Manifest> {
        let content = read_source(&self.path)?;
        parse_json(&self.path, &content)
    }
}

impl ModelProvider for ManifestFile {
    fn declared_model(&self) -> Result<Vec<DeclaredEntity>> {
        let manifest = self.load()?;
        debug!(path = %self.path.display(), entities = manifest.entities.len(), "Loaded manifest");
        source::build_model(&manifest.entities)
    }
}

/// Live snapshot read from a JSON file.
///
/// Accepts either a [`LiveSchema`] object (`{"tables": {...}}`) or a plain
/// array of tables.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Schema(LiveSchema),
    Tables(Vec<LiveTable>),
}

impl SnapshotProvider for SnapshotFile {
    fn live_snapshot(&self) -> Result<LiveSchema> {
        let content = read_source(&self.path)?;
        let schema = match parse_json(&self.path, &content)? {
            SnapshotDocument::Schema(schema) => schema,
            SnapshotDocument::Tables(tables) => {
                let mut schema = LiveSchema::new();
                for table in tables {
                    if schema.get_table(&table.name).is_some() {
                        return Err(ReconcileError::metadata(
                            self.path.display().to_string(),
                            format!("table '{}' listed twice", table.name),
                        ));
                    }
                    schema.insert(table);
                }
                schema
            }
        };
        for (key, table) in &schema.tables {
            if *key != table.name {
                return Err(ReconcileError::metadata(
                    self.path.display().to_string(),
                    format!("table key '{key}' does not match table name '{}'", table.name),
                ));
            }
        }
        debug!(path = %self.path.display(), tables = schema.tables.len(), "Loaded snapshot");
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use tempfile::NamedTempFile;

    fn temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_in_memory_model_rejects_duplicate_tables() {
        let model = vec![
            DeclaredEntity::new("Order"),
            DeclaredEntity::new("Purchase").table("order"),
        ];
        let err = model.declared_model().unwrap_err();
        match err {
            ReconcileError::DuplicateTable { table, first, second } => {
                assert_eq!(table, "order");
                assert_eq!(first, "Order");
                assert_eq!(second, "Purchase");
            }
            other => panic!("Expected DuplicateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_connection_error() {
        let err = SnapshotFile::new("/nonexistent/snapshot.json")
            .live_snapshot()
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Connection { .. }));
    }

    #[test]
    fn test_malformed_json_is_metadata_error() {
        let file = temp_json("{ not json");
        let err = ManifestFile::new(file.path()).declared_model().unwrap_err();
        assert!(matches!(err, ReconcileError::MetadataParse { .. }));
    }

    #[test]
    fn test_snapshot_as_table_list() {
        let file = temp_json(
            r#"[{ "name": "order", "columns": [{ "name": "id", "type": "bigint" }] }]"#,
        );
        let schema = SnapshotFile::new(file.path()).live_snapshot().unwrap();
        assert!(schema.get_table("order").unwrap().has_column("id"));
    }

    #[test]
    fn test_snapshot_key_mismatch_rejected() {
        let file = temp_json(r#"{ "tables": { "a": { "name": "b" } } }"#);
        let err = SnapshotFile::new(file.path()).live_snapshot().unwrap_err();
        assert!(matches!(err, ReconcileError::MetadataParse { .. }));
    }

    #[test]
    fn test_manifest_builds_model() {
        let file = temp_json(
            r#"{ "entities": [{ "name": "OrderItem", "fields": [{ "name": "unitPrice", "type": "Decimal" }] }] }"#,
        );
        let entities = ManifestFile::new(file.path()).declared_model().unwrap();
        assert_eq!(entities[0].table_name, "order_item");
        assert_eq!(entities[0].fields[0].column_name, "unit_price");
    }
}
