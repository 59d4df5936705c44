//! Extensions shipped with the CLI host.
//!
//! Configurations reference them by their `eden://builtin/...` locator.

use serde_json::{json, Value};

use eden_core::types::{HookSource, PackageOptions};
use eden_core::utils::LogLevel;
use eden_runtime::plugin::{ExecuteContext, FnExtension, StaticExtensionLoader};

/// Locator of the system report extension.
pub const SYSTEM_REPORT: &str = "eden://builtin/system-report";

/// Locator of the environment dump extension.
pub const ENV_REPORT: &str = "eden://builtin/env-report";

fn package(name: &str) -> PackageOptions {
    let mut options = PackageOptions::new(name, env!("CARGO_PKG_VERSION"));
    options.authors = vec!["Edgeless Team".to_string()];
    options.license = "MIT".to_string();
    options
}

/// Logs the host inventory. Needs `query-system-info` and `log`.
async fn system_report(ctx: ExecuteContext, _args: Vec<Value>) -> eden_core::Result<Value> {
    let info = ctx.utils.system_info().await?;
    let report = json!({
        "stage": ctx.stage,
        "os": info.platform.os,
        "arch": info.platform.arch,
        "hostname": info.hostname,
        "processors": info.processors,
        "totalMemory": info.total_memory,
        "bootPolicy": info.boot_policy,
        "drives": ctx.bootstrap.drives,
    });
    ctx.utils.log(LogLevel::Info, &report.to_string());
    Ok(report)
}

/// Logs the names of the environment variables the hook sees. Needs `log`.
async fn env_report(ctx: ExecuteContext, _args: Vec<Value>) -> eden_core::Result<Value> {
    let keys = ctx.env.keys();
    ctx.utils.log(
        LogLevel::Info,
        &format!("{} environment variables: {}", keys.len(), keys.join(", ")),
    );
    Ok(Value::from(keys.len()))
}

/// Every built-in extension, keyed by locator.
pub fn catalogue() -> StaticExtensionLoader {
    let loader = StaticExtensionLoader::new();

    if let Ok(source) = HookSource::parse(SYSTEM_REPORT) {
        loader.insert(
            source,
            std::sync::Arc::new(FnExtension::new(package("system-report"), |script| {
                script.use_entry(system_report);
            })),
        );
    }
    if let Ok(source) = HookSource::parse(ENV_REPORT) {
        loader.insert(
            source,
            std::sync::Arc::new(FnExtension::new(package("env-report"), |script| {
                script.use_entry(env_report);
            })),
        );
    }

    loader
}

#[cfg(test)]
mod tests {
    use super::*;
    use eden_runtime::plugin::ExtensionLoader;

    #[tokio::test]
    async fn test_catalogue_resolves_builtin_locators() {
        let loader = catalogue();
        assert_eq!(loader.len(), 2);

        let source = HookSource::parse("EDEN://Builtin/system-report").unwrap();
        let extension = loader.load(&source).await.unwrap();
        assert_eq!(extension.package().name, "system-report");
    }
}
