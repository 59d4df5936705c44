//! Utility functions and types.
//!
//! Path normalization, log levels and version handling shared by every
//! Eden crate.

pub mod logging;
pub mod path;
pub mod version;

pub use logging::LogLevel;
pub use version::{Version, VersionRange};
