//! In-memory environment storage.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use eden_core::error::PluginError;

use super::EnvStore;

/// Environment kept in memory, for sandboxed hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryEnvStore {
    vars: RwLock<BTreeMap<String, String>>,
}

impl MemoryEnvStore {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment holding `vars`.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: RwLock::new(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl EnvStore for MemoryEnvStore {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn get(&self, name: &str) -> Option<String> {
        self.vars.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: &str) -> Result<(), PluginError> {
        if name.is_empty() {
            return Err(PluginError::Host(
                "Environment variable name cannot be empty".to_string(),
            ));
        }
        self.vars.write().insert(name.to_string(), value.to_string());
        Ok(())
    }
}
