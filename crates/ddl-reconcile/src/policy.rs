//! Reconciliation policy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::naming;

fn default_exclusions() -> BTreeSet<String> {
    ["id", "creator", "updater", "create_time", "update_time"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn enabled() -> bool {
    true
}

/// Options controlling what the differ emits.
///
/// Passed explicitly into every entry point; there is no global default
/// other than [`DiffPolicy::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPolicy {
    /// Column-name aliases never added to an existing table. Compared by
    /// [`naming::convention_key`], so `createTime` also excludes
    /// `create_time`.
    #[serde(default = "default_exclusions")]
    pub audit_column_exclusions: BTreeSet<String>,
    /// Emit missing indexes.
    #[serde(default = "enabled")]
    pub manage_indexes: bool,
    /// Emit missing foreign keys.
    #[serde(default = "enabled")]
    pub manage_foreign_keys: bool,
    /// Emit DROP statements for obsolete foreign keys. Only takes effect when
    /// `manage_foreign_keys` is also set.
    #[serde(default)]
    pub allow_dropping_foreign_keys: bool,
}

impl Default for DiffPolicy {
    fn default() -> Self {
        Self {
            audit_column_exclusions: default_exclusions(),
            manage_indexes: true,
            manage_foreign_keys: true,
            allow_dropping_foreign_keys: false,
        }
    }
}

impl DiffPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the audit exclusion set.
    #[must_use]
    pub fn with_exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audit_column_exclusions = exclusions.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables index reconciliation.
    #[must_use]
    pub fn manage_indexes(mut self, enabled: bool) -> Self {
        self.manage_indexes = enabled;
        self
    }

    /// Enables or disables foreign key reconciliation.
    #[must_use]
    pub fn manage_foreign_keys(mut self, enabled: bool) -> Self {
        self.manage_foreign_keys = enabled;
        self
    }

    /// Allows dropping live foreign keys the model no longer declares.
    #[must_use]
    pub fn allow_dropping_foreign_keys(mut self, enabled: bool) -> Self {
        self.allow_dropping_foreign_keys = enabled;
        self
    }

    /// Whether obsolete foreign keys may be dropped.
    #[must_use]
    pub fn drops_foreign_keys(&self) -> bool {
        self.manage_foreign_keys && self.allow_dropping_foreign_keys
    }

    /// Whether `column` is an audit column under this policy.
    #[must_use]
    pub fn is_audit_column(&self, column: &str) -> bool {
        let key = naming::convention_key(column);
        self.audit_column_exclusions
            .iter()
            .any(|alias| naming::convention_key(alias) == key)
    }
}
