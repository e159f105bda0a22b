//! Dialect registry.
//!
//! The registry is built once at startup and passed by reference to whoever
//! needs a dialect; there is no global instance. Lookups take a read lock and
//! registrations a write lock, so dialects can be added while diffs run.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{ReconcileError, Result};

use super::{DialectStrategy, MySqlDialect, PostgresDialect};

type DialectMap = BTreeMap<String, Arc<dyn DialectStrategy>>;

fn normalize(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

/// Thread-safe map from engine identifier to dialect.
#[derive(Default)]
pub struct DialectRegistry {
    dialects: RwLock<DialectMap>,
}

impl std::fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("dialects", &self.supported_databases())
            .finish()
    }
}

impl DialectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the MySQL and PostgreSQL dialects registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(MySqlDialect::new());
        registry.register(PostgresDialect::new());
        registry
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, DialectMap> {
        self.dialects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DialectMap> {
        self.dialects.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a dialect under its own identifier, replacing any previous
    /// registration.
    pub fn register<D: DialectStrategy + 'static>(&self, dialect: D) {
        self.register_arc(Arc::new(dialect));
    }

    /// Registers an already shared dialect.
    pub fn register_arc(&self, dialect: Arc<dyn DialectStrategy>) {
        let id = normalize(dialect.id());
        debug!(dialect = %id, "Registering dialect");
        self.write().insert(id, dialect);
    }

    /// Looks up a dialect. Identifiers are case-insensitive.
    pub fn get_dialect(&self, id: &str) -> Result<Arc<dyn DialectStrategy>> {
        let requested = normalize(id);
        let dialects = self.read();
        dialects
            .get(&requested)
            .cloned()
            .ok_or_else(|| ReconcileError::UnsupportedDialect {
                requested,
                supported: dialects.keys().cloned().collect(),
            })
    }

    /// Whether a dialect is registered for `id`.
    #[must_use]
    pub fn supports(&self, id: &str) -> bool {
        self.read().contains_key(&normalize(id))
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn supported_databases(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}
