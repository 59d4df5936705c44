//! Command implementations for the Eden CLI

pub mod boot;
pub mod permission;
pub mod system;

use tracing_subscriber::EnvFilter;

use eden_runtime::system::LoggingConfig;

/// Initialize logging on stderr from the configuration.
///
/// `RUST_LOG` overrides the configured level.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = if logging.structured {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
