//! The seam between the dispatcher and whatever runs extension code.

use async_trait::async_trait;

use eden_core::error::PluginError;
use eden_core::id::InvocationId;
use eden_core::types::{HookSource, LifecycleStage};

/// One scheduled run of a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInvocation {
    /// Unique id of this run
    pub id: InvocationId,

    /// Stage being entered
    pub stage: LifecycleStage,

    /// Hook to run
    pub source: HookSource,
}

impl HookInvocation {
    /// New invocation of `source` for `stage`.
    pub fn new(stage: LifecycleStage, source: HookSource) -> Self {
        Self {
            id: InvocationId::new(),
            stage,
            source,
        }
    }
}

/// Runs hooks on behalf of the dispatcher.
///
/// Implementations should report failures as `Err`; panics and timeouts are
/// caught by the dispatcher.
#[async_trait]
pub trait HookExecutor: Send + Sync {
    /// Run one hook to completion.
    async fn execute(&self, invocation: HookInvocation) -> Result<(), PluginError>;
}
