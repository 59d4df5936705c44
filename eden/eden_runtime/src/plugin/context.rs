//! Per-invocation context passed to extension handlers.

use std::sync::Arc;

use eden_core::id::InvocationId;
use eden_core::types::{
    BootstrapData, HookSource, LifecycleStage, PackageLoadOptions, PackageOptions,
};

use super::env::EnvView;
use super::utils::PackageUtils;

/// What a handler sees of the host.
///
/// Built fresh for every invocation and immutable afterwards; cloning is
/// cheap.
#[derive(Clone, Debug)]
pub struct ExecuteContext {
    /// Environment view
    pub env: EnvView,

    /// Boot environment facts
    pub bootstrap: Arc<BootstrapData>,

    /// Metadata the extension declared
    pub package: Arc<PackageOptions>,

    /// How the host loaded the package
    pub opts: Arc<PackageLoadOptions>,

    /// Utilities bound to this package
    pub utils: PackageUtils,

    /// Stage being entered
    pub stage: LifecycleStage,

    /// Hook being run
    pub source: HookSource,

    /// This invocation
    pub invocation: InvocationId,
}
