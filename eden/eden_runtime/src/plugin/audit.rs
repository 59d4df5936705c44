//! Audit trail of utility calls.
//!
//! Every utility an extension calls is recorded against the package that
//! made the call, whether or not the call was permitted.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use eden_core::id::PackageId;
use eden_core::types::PermissionDescriptor;

/// Default number of entries kept per package.
pub const DEFAULT_MAX_ENTRIES_PER_PACKAGE: usize = 1024;

/// One recorded utility call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Package identity the call is attributed to
    pub package_id: PackageId,

    /// Package name
    pub package: String,

    /// Utility that was called (`fs_exist`, `env.global_set`, ...)
    pub operation: String,

    /// Descriptor checked for the call, if any
    pub descriptor: Option<PermissionDescriptor>,

    /// Whether the permission check passed
    pub permitted: bool,

    /// When the call was made
    pub at: DateTime<Utc>,
}

/// Bounded per-package audit log.
#[derive(Clone)]
pub struct AuditLog {
    entries: Arc<DashMap<PackageId, Vec<AuditEntry>>>,
    max_entries_per_package: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES_PER_PACKAGE)
    }
}

impl AuditLog {
    /// Create a log keeping at most `max_entries_per_package` entries per package.
    pub fn new(max_entries_per_package: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries_per_package: max_entries_per_package.max(1),
        }
    }

    /// Record a call.
    pub fn record(
        &self,
        package_id: PackageId,
        package: &str,
        operation: &str,
        descriptor: Option<PermissionDescriptor>,
        permitted: bool,
    ) {
        let entry = AuditEntry {
            package_id,
            package: package.to_string(),
            operation: operation.to_string(),
            descriptor,
            permitted,
            at: Utc::now(),
        };

        let mut package_entries = self.entries.entry(package_id).or_default();
        package_entries.push(entry);
        if package_entries.len() > self.max_entries_per_package {
            let to_remove = package_entries.len() - self.max_entries_per_package;
            package_entries.drain(0..to_remove);
        }
    }

    /// Entries for one package identity, oldest first.
    pub fn entries_for(&self, package_id: &PackageId) -> Vec<AuditEntry> {
        self.entries
            .get(package_id)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Entries for every identity of the package called `name`, oldest first.
    pub fn entries_named(&self, name: &str) -> Vec<AuditEntry> {
        let mut entries: Vec<AuditEntry> = self
            .entries
            .iter()
            .flat_map(|e| e.value().clone())
            .filter(|e| e.package == name)
            .collect();
        entries.sort_by_key(|e| e.at);
        entries
    }

    /// All entries, oldest first.
    pub fn all_entries(&self) -> Vec<AuditEntry> {
        let mut entries: Vec<AuditEntry> = self
            .entries
            .iter()
            .flat_map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.at);
        entries
    }

    /// Forget everything recorded for `package_id`.
    pub fn clear(&self, package_id: &PackageId) {
        self.entries.remove(package_id);
    }
}
