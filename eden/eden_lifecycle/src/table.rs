//! Per-stage hook registrations.
//!
//! Each stage's list has its own lock, so registering for one stage never
//! waits on another.

use parking_lot::RwLock;

use eden_core::types::{HookSource, LifecycleStage};

/// Ordered, duplicate-free hook lists, one per stage.
#[derive(Debug, Default)]
pub struct HookTable {
    hooks: [RwLock<Vec<HookSource>>; 12],
}

impl HookTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, stage: LifecycleStage) -> &RwLock<Vec<HookSource>> {
        &self.hooks[stage.index()]
    }

    /// Append `source` to `stage`. Returns false if it is already there.
    pub fn register(&self, stage: LifecycleStage, source: HookSource) -> bool {
        let mut hooks = self.slot(stage).write();
        if hooks.contains(&source) {
            return false;
        }
        hooks.push(source);
        true
    }

    /// Remove `source` from `stage`, keeping the order of the others.
    pub fn unregister(&self, stage: LifecycleStage, source: &HookSource) -> bool {
        let mut hooks = self.slot(stage).write();
        match hooks.iter().position(|hook| hook == source) {
            Some(index) => {
                hooks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Hooks of `stage` in registration order.
    pub fn list(&self, stage: LifecycleStage) -> Vec<HookSource> {
        self.slot(stage).read().clone()
    }

    /// Number of hooks registered across all stages.
    pub fn len(&self) -> usize {
        self.hooks.iter().map(|hooks| hooks.read().len()).sum()
    }

    /// Whether no hook is registered at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
