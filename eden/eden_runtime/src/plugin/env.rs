//! Environment view handed to hooks.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use eden_core::types::PermissionDescriptor;
use eden_core::Result;

use super::utils::PackageScope;

/// Ordered view of the host environment.
///
/// The view starts as a snapshot of the host environment taken when the
/// hook was invoked. `set` and `delete` only change this view (clones of a
/// context share it); [`global_set`](Self::global_set) writes through to the
/// host after an `env{variable}` permission check.
#[derive(Clone)]
pub struct EnvView {
    base: Arc<BTreeMap<String, String>>,
    // `None` marks a deletion
    overlay: Arc<RwLock<BTreeMap<String, Option<String>>>>,
    scope: Arc<PackageScope>,
}

impl EnvView {
    pub(crate) fn snapshot(scope: Arc<PackageScope>) -> Self {
        let base = scope.host.env.vars().into_iter().collect();
        Self {
            base: Arc::new(base),
            overlay: Arc::new(RwLock::new(BTreeMap::new())),
            scope,
        }
    }

    /// Value of `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        match self.overlay.read().get(name) {
            Some(value) => value.clone(),
            None => self.base.get(name).cloned(),
        }
    }

    /// Set `name` in this view only.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.overlay.write().insert(name.into(), Some(value.into()));
    }

    /// Remove `name` from this view only. Returns whether it was visible.
    pub fn delete(&self, name: &str) -> bool {
        let existed = self.get(name).is_some();
        self.overlay.write().insert(name.to_string(), None);
        existed
    }

    /// Whether `name` is visible.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Variable names, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.to_map().into_keys().collect()
    }

    /// Values, in key order.
    pub fn values(&self) -> Vec<String> {
        self.to_map().into_values().collect()
    }

    /// `(name, value)` pairs, in key order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.to_map().into_iter().collect()
    }

    /// The view as a map.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut merged = (*self.base).clone();
        for (name, value) in self.overlay.read().iter() {
            match value {
                Some(value) => {
                    merged.insert(name.clone(), value.clone());
                }
                None => {
                    merged.remove(name);
                }
            }
        }
        merged
    }

    /// Set `name` for the whole host. Needs `env{name}`.
    ///
    /// On success the view reflects the new value as well.
    pub async fn global_set(&self, name: &str, value: &str) -> Result<()> {
        let descriptor = PermissionDescriptor::env(name);
        self.scope.gate("env.global_set", descriptor).await?;

        self.scope.host.env.set(name, value)?;
        info!(package = %self.scope.package, variable = %name, "Host environment variable set");
        self.set(name, value);
        Ok(())
    }
}

impl std::fmt::Debug for EnvView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.to_map()).finish()
    }
}
