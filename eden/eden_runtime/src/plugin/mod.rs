//! Plugin execution boundary.
//!
//! This module turns hook invocations from the lifecycle dispatcher into
//! runs of extension code: loading, context assembly, gated utilities and
//! the audit trail of what each package did.

pub mod audit;
pub mod boundary;
pub mod context;
pub mod env;
pub mod extension;
pub mod loader;
pub mod utils;

// Re-export key types for convenience
pub use audit::{AuditEntry, AuditLog};
pub use boundary::PluginBoundary;
pub use context::ExecuteContext;
pub use env::EnvView;
pub use extension::{Extension, FnExtension, Handler, PluginScript};
pub use loader::{ExtensionLoader, StaticExtensionLoader};
pub use utils::{ExtensionPermissions, PackageUtils};
