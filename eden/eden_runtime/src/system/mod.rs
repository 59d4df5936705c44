//! System configuration and boot sequencing for the Eden runtime.

pub mod boot;
pub mod config;

pub use boot::BootError;
pub use config::{LoggingConfig, PackageConfig, PermissionsConfig, RuntimeConfig};
