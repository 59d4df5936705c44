//! The plugin execution boundary.
//!
//! [`PluginBoundary`] is the [`HookExecutor`] the lifecycle dispatcher hands
//! hooks to. For each invocation it loads the extension, builds a fresh
//! [`ExecuteContext`] bound to a new package identity, and runs the
//! extension's entry handlers followed by its ready handlers.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use eden_core::error::PluginError;
use eden_core::id::PackageId;
use eden_core::types::{BootstrapData, HookSource, PackageLoadOptions, PackageOptions};
use eden_core::utils::{path, Version};
use eden_lifecycle::{HookExecutor, HookInvocation, LifecycleHandle};
use eden_permission::PermissionRegistry;

use super::audit::AuditLog;
use super::context::ExecuteContext;
use super::env::EnvView;
use super::extension::{Handler, PluginScript};
use super::loader::ExtensionLoader;
use super::utils::{PackageScope, PackageUtils};
use crate::host::HostServices;
use crate::system::config::PackageConfig;

/// Runs hooks on behalf of the lifecycle dispatcher.
pub struct PluginBoundary {
    loader: Arc<dyn ExtensionLoader>,
    registry: PermissionRegistry,
    host: HostServices,
    audit: AuditLog,
    bootstrap: Arc<BootstrapData>,
    host_version: Option<Version>,
    packages: BTreeMap<String, PackageConfig>,

    // Set once the dispatcher that owns this boundary exists
    lifecycle: OnceCell<LifecycleHandle>,
}

impl PluginBoundary {
    /// Create a boundary. It cannot run hooks until
    /// [`attach_lifecycle`](Self::attach_lifecycle) was called.
    pub fn new(
        loader: Arc<dyn ExtensionLoader>,
        registry: PermissionRegistry,
        host: HostServices,
        audit: AuditLog,
        bootstrap: BootstrapData,
        packages: BTreeMap<String, PackageConfig>,
    ) -> Self {
        let host_version = match bootstrap.version.parse::<Version>() {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(version = %bootstrap.version, error = %e, "Host version is not a semantic version; compatibility checks disabled");
                None
            }
        };

        Self {
            loader,
            registry,
            host,
            audit,
            bootstrap: Arc::new(bootstrap),
            host_version,
            packages,
            lifecycle: OnceCell::new(),
        }
    }

    /// Give extensions access to the dispatcher's hook table.
    ///
    /// Returns false if a handle was already attached.
    pub fn attach_lifecycle(&self, handle: LifecycleHandle) -> bool {
        self.lifecycle.set(handle).is_ok()
    }

    /// Boot environment facts handed to every hook.
    pub fn bootstrap(&self) -> &BootstrapData {
        &self.bootstrap
    }

    /// The audit log utility calls are recorded in.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    fn check_compatibility(&self, package: &PackageOptions) {
        let Some(host) = &self.host_version else {
            return;
        };
        if !package.is_compatible_with(host) {
            warn!(
                package = %package.name,
                host_version = %host,
                compat = ?package.compat,
                "Package does not declare compatibility with this host version"
            );
        } else if !package.is_tested_on(host) {
            debug!(package = %package.name, host_version = %host, "Package was not tested on this host version");
        }
    }

    fn load_options(&self, package: &PackageOptions, source: &HookSource) -> PackageLoadOptions {
        let config = self.packages.get(&package.name);

        let dest = match config.and_then(|c| c.dest.as_deref()) {
            Some(dest) => path::resolve(&self.bootstrap.location, dest),
            None => source
                .as_path()
                .and_then(|p| path::ancestors(p).into_iter().next())
                .unwrap_or_else(|| path::normalize_path(&self.bootstrap.location)),
        };

        PackageLoadOptions {
            user_policy: config.and_then(|c| c.user_policy.clone()),
            dest,
            localboost: config.map(|c| c.localboost).unwrap_or(false),
            package_type: package.package_type,
        }
    }

    async fn run_handlers(
        &self,
        phase: &str,
        handlers: &[Handler],
        ctx: &ExecuteContext,
        args: &[Value],
    ) -> Result<(), PluginError> {
        for (index, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler(ctx.clone(), args.to_vec()).await {
                return Err(PluginError::HookExecution {
                    stage: ctx.stage,
                    locator: ctx.source.to_string(),
                    message: format!("{} handler #{} of {} failed: {}", phase, index, ctx.package.name, e),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HookExecutor for PluginBoundary {
    async fn execute(&self, invocation: HookInvocation) -> Result<(), PluginError> {
        let HookInvocation { id, stage, source } = invocation;
        let failed = |message: String| PluginError::HookExecution {
            stage,
            locator: source.to_string(),
            message,
        };

        let lifecycle = self
            .lifecycle
            .get()
            .cloned()
            .ok_or_else(|| failed("boundary is not attached to a lifecycle dispatcher".to_string()))?;

        let extension = self
            .loader
            .load(&source)
            .await
            .map_err(|e| failed(e.to_string()))?;

        let package = extension.package();
        self.check_compatibility(&package);

        let mut script = PluginScript::new();
        extension.setup(&mut script);

        let opts = self.load_options(&package, &source);
        let scope = Arc::new(PackageScope {
            package_id: PackageId::new(),
            package: package.name.clone(),
            dest: opts.dest.clone(),
            registry: self.registry.clone(),
            host: self.host.clone(),
            audit: self.audit.clone(),
            lifecycle,
        });
        debug!(
            package = %package.name,
            package_id = %scope.package_id,
            %stage,
            %source,
            "Running extension"
        );

        let ctx = ExecuteContext {
            env: EnvView::snapshot(Arc::clone(&scope)),
            bootstrap: Arc::clone(&self.bootstrap),
            package: Arc::new(package),
            opts: Arc::new(opts),
            utils: PackageUtils::new(scope),
            stage,
            source: source.clone(),
            invocation: id,
        };
        let args = [Value::from(stage.as_str()), Value::from(source.as_str())];

        self.run_handlers("entry", script.entries(), &ctx, &args).await?;
        self.run_handlers("ready", script.ready(), &ctx, &args).await?;

        info!(package = %ctx.package.name, %stage, %source, "Extension finished");
        Ok(())
    }
}
