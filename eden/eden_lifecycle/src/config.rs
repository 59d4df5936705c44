//! Dispatcher configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use eden_core::error::{Error, Result};
use eden_core::types::LifecycleStage;

/// Settings that control how hooks run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum number of hooks of one stage running at the same time
    #[serde(default = "default_max_concurrent_hooks")]
    pub max_concurrent_hooks: usize,

    /// Per-hook time limit in milliseconds
    #[serde(default = "default_hook_timeout_ms")]
    pub hook_timeout_ms: u64,

    /// Stages whose hooks must all succeed
    #[serde(default)]
    pub gating_stages: Vec<LifecycleStage>,
}

fn default_max_concurrent_hooks() -> usize {
    4
}

fn default_hook_timeout_ms() -> u64 {
    30_000
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_hooks: default_max_concurrent_hooks(),
            hook_timeout_ms: default_hook_timeout_ms(),
            gating_stages: Vec::new(),
        }
    }
}

impl DispatcherConfig {
    /// Per-hook time limit.
    pub fn hook_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_timeout_ms)
    }

    /// Whether a failed hook in `stage` fails the advance.
    pub fn is_gating(&self, stage: LifecycleStage) -> bool {
        self.gating_stages.contains(&stage)
    }

    /// Reject settings the dispatcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_hooks == 0 {
            return Err(Error::Config(
                "dispatcher.max_concurrent_hooks must be at least 1".to_string(),
            ));
        }
        if self.hook_timeout_ms == 0 {
            return Err(Error::Config(
                "dispatcher.hook_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
