//! # Eden Core
//!
//! `eden_core` provides the shared vocabulary of the Eden extension host:
//! identifiers, the error hierarchy and the data model that the permission
//! engine, the lifecycle dispatcher and the plugin boundary exchange.
//!
//! ## Core Concepts
//!
//! 1. **Permission descriptors**: a closed set of typed resource classes
//!    (`read`, `net`, `lifecycle-hook`, ...), optionally scoped. Descriptors
//!    are normalized before they are used as keys, so semantically identical
//!    descriptors always denote the same decision.
//!
//! 2. **Lifecycle stages**: the twelve fixed points of host startup, totally
//!    ordered from `os-startup` to `os-boot-finished`.
//!
//! 3. **Hook sources**: normalized absolute locators of extension code.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Eden components
//! - **id**: Strongly-typed identifier types
//! - **types**: Descriptors, stages, locators, package and bootstrap data
//! - **utils**: Path normalization, log levels and version ranges

pub mod error;
pub mod id;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use error::{Error, LifecycleError, PermissionError, PluginError, Result};
pub use id::{InvocationId, PackageId, SubscriptionId};
pub use types::{
    BootPolicy, BootstrapData, HookSource, LifecycleStage, PackageLoadOptions, PackageOptions,
    PackageType, PermissionDescriptor, PermissionKind, PermissionState,
};
pub use utils::{LogLevel, Version};
