//! Utilities handed to extension code.
//!
//! Every utility is bound to one package identity. Privileged utilities go
//! through the permission registry before touching a host collaborator, and
//! every call lands in the [`AuditLog`] attributed to that package.

use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

use eden_core::error::{Error, PermissionError, PluginError};
use eden_core::id::PackageId;
use eden_core::types::{HookSource, LifecycleStage, PermissionDescriptor, PermissionState};
use eden_core::utils::{path, LogLevel};
use eden_core::Result;
use eden_lifecycle::LifecycleHandle;
use eden_permission::{PermissionRegistry, PermissionStatus};

use super::audit::AuditLog;
use crate::host::{HostServices, Stat, SystemInfo};

/// Everything a package's utilities are bound to.
pub(crate) struct PackageScope {
    pub package_id: PackageId,
    pub package: String,
    pub dest: String,
    pub registry: PermissionRegistry,
    pub host: HostServices,
    pub audit: AuditLog,
    pub lifecycle: LifecycleHandle,
}

impl PackageScope {
    fn audit(&self, operation: &str, descriptor: Option<PermissionDescriptor>, permitted: bool) {
        self.audit
            .record(self.package_id, &self.package, operation, descriptor, permitted);
    }

    /// Request `descriptor` on behalf of the package and audit the outcome.
    pub(crate) async fn gate(
        &self,
        operation: &str,
        descriptor: PermissionDescriptor,
    ) -> std::result::Result<(), PermissionError> {
        let outcome = self.registry.require(&descriptor).await;
        if let Err(e) = &outcome {
            debug!(package = %self.package, %operation, error = %e, "Utility call refused");
        }
        self.audit(operation, Some(descriptor), outcome.is_ok());
        outcome
    }
}

/// Utilities bound to one package.
#[derive(Clone)]
pub struct PackageUtils {
    scope: Arc<PackageScope>,
}

impl std::fmt::Debug for PackageUtils {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageUtils")
            .field("package", &self.scope.package)
            .field("package_id", &self.scope.package_id)
            .finish()
    }
}

impl PackageUtils {
    pub(crate) fn new(scope: Arc<PackageScope>) -> Self {
        Self { scope }
    }

    /// Identity the calls are attributed to.
    pub fn package_id(&self) -> PackageId {
        self.scope.package_id
    }

    /// Name of the package.
    pub fn package_name(&self) -> &str {
        &self.scope.package
    }

    /// Resolve `target` against the package's `dest` directory.
    pub fn resolve_path(&self, target: &str) -> String {
        path::resolve(&self.scope.dest, target)
    }

    /// Whether `target` exists. Needs `read{target}`.
    pub async fn fs_exist(&self, target: &str) -> Result<bool> {
        let resolved = self.resolve_path(target);
        self.scope
            .gate("fs_exist", PermissionDescriptor::read(resolved.as_str()))
            .await?;
        Ok(self.scope.host.fs.exists(&resolved).await?)
    }

    /// Metadata of `target`. Needs `read{target}`; missing is `ResourceNotFound`.
    pub async fn fs_stat(&self, target: &str) -> Result<Stat> {
        let resolved = self.resolve_path(target);
        self.scope
            .gate("fs_stat", PermissionDescriptor::read(resolved.as_str()))
            .await?;
        self.scope
            .host
            .fs
            .stat(&resolved)
            .await?
            .ok_or(Error::Plugin(PluginError::ResourceNotFound(resolved)))
    }

    /// Whether a process called `name` runs. Needs `query-system-info`.
    pub async fn is_alive(&self, name: &str) -> Result<bool> {
        self.scope
            .gate("is_alive", PermissionDescriptor::QuerySystemInfo)
            .await?;
        Ok(self.scope.host.processes.is_alive(name).await?)
    }

    /// Whether a window titled `name` is visible. Needs `query-system-info`.
    pub async fn is_visible(&self, name: &str) -> Result<bool> {
        self.scope
            .gate("is_visible", PermissionDescriptor::QuerySystemInfo)
            .await?;
        Ok(self.scope.host.windows.is_visible(name).await?)
    }

    /// Host inventory. Needs `query-system-info`.
    pub async fn system_info(&self) -> Result<SystemInfo> {
        self.scope
            .gate("system_info", PermissionDescriptor::QuerySystemInfo)
            .await?;
        Ok(self.scope.host.system.system_info().await?)
    }

    /// Write `message` to the host log, tagged with the package.
    ///
    /// Only an explicit `log` grant lets the message through; the check is a
    /// query and never prompts. Returns whether the message was written.
    pub fn log(&self, level: LogLevel, message: &str) -> bool {
        let permitted = self.scope.registry.query(&PermissionDescriptor::Log)
            == PermissionState::Granted;
        self.scope
            .audit("log", Some(PermissionDescriptor::Log), permitted);
        if !permitted {
            return false;
        }

        let package = self.scope.package.as_str();
        match level {
            LogLevel::Trace => trace!(target: "eden::extension", %package, "{}", message),
            LogLevel::Debug => debug!(target: "eden::extension", %package, "{}", message),
            LogLevel::Info => info!(target: "eden::extension", %package, "{}", message),
            LogLevel::Warn => warn!(target: "eden::extension", %package, "{}", message),
            LogLevel::Error => error!(target: "eden::extension", %package, "{}", message),
        }
        true
    }

    /// Register a hook for `stage`. Needs `lifecycle-hook{locator}`.
    ///
    /// Relative locators are resolved against `dest`. Returns false if the
    /// hook was already registered.
    pub async fn register_hook(&self, stage: LifecycleStage, locator: &str) -> Result<bool> {
        let source = self.hook_source(locator)?;
        self.scope
            .gate(
                "register_hook",
                PermissionDescriptor::lifecycle_hook(source.as_str()),
            )
            .await?;
        Ok(self.scope.lifecycle.register(stage, source))
    }

    /// Remove a hook from `stage`. Needs `lifecycle-hook{locator}`.
    pub async fn unregister_hook(&self, stage: LifecycleStage, locator: &str) -> Result<bool> {
        let source = self.hook_source(locator)?;
        self.scope
            .gate(
                "unregister_hook",
                PermissionDescriptor::lifecycle_hook(source.as_str()),
            )
            .await?;
        Ok(self.scope.lifecycle.unregister(stage, &source))
    }

    /// Hooks registered for `stage`, in registration order.
    pub fn list_hooks(&self, stage: LifecycleStage) -> Vec<HookSource> {
        self.scope.audit("list_hooks", None, true);
        self.scope.lifecycle.list(stage)
    }

    /// The stage the host is in.
    pub fn lifecycle_state(&self) -> Option<LifecycleStage> {
        self.scope.audit("lifecycle_state", None, true);
        self.scope.lifecycle.state()
    }

    /// The package's view of its own permissions.
    pub fn permissions(&self) -> ExtensionPermissions {
        ExtensionPermissions {
            scope: Arc::clone(&self.scope),
        }
    }

    fn hook_source(&self, locator: &str) -> Result<HookSource> {
        Ok(HookSource::resolve(&self.scope.dest, locator)?)
    }
}

/// Permission queries an extension may make about itself.
#[derive(Clone)]
pub struct ExtensionPermissions {
    scope: Arc<PackageScope>,
}

impl ExtensionPermissions {
    /// Current state, without prompting.
    pub fn query(&self, descriptor: &PermissionDescriptor) -> PermissionState {
        let state = self.scope.registry.query(descriptor);
        self.scope
            .audit("permissions.query", Some(descriptor.normalize()), true);
        state
    }

    /// Ask for `descriptor`, prompting if undecided.
    pub async fn request(&self, descriptor: &PermissionDescriptor) -> Result<PermissionState> {
        let outcome = self.scope.registry.request(descriptor).await;
        self.scope.audit(
            "permissions.request",
            Some(descriptor.normalize()),
            matches!(outcome, Ok(PermissionState::Granted)),
        );
        Ok(outcome?)
    }

    /// Give up `descriptor`.
    pub async fn revoke(&self, descriptor: &PermissionDescriptor) -> PermissionState {
        let state = self.scope.registry.revoke(descriptor).await;
        self.scope
            .audit("permissions.revoke", Some(descriptor.normalize()), true);
        state
    }

    /// Watch `descriptor` for changes.
    pub fn subscribe(&self, descriptor: &PermissionDescriptor) -> PermissionStatus {
        self.scope
            .audit("permissions.subscribe", Some(descriptor.normalize()), true);
        self.scope.registry.subscribe(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryEnvStore;
    use eden_core::types::BootPolicy;
    use eden_lifecycle::{DispatcherConfig, HookExecutor, HookInvocation, LifecycleDispatcher};
    use eden_permission::StaticPrompter;

    struct NoopExecutor;

    #[async_trait::async_trait]
    impl HookExecutor for NoopExecutor {
        async fn execute(&self, _invocation: HookInvocation) -> std::result::Result<(), PluginError> {
            Ok(())
        }
    }

    fn utils_with(registry: PermissionRegistry, dest: &str) -> (PackageUtils, AuditLog) {
        let dispatcher = LifecycleDispatcher::new(DispatcherConfig::default(), Arc::new(NoopExecutor));
        let audit = AuditLog::default();
        let scope = PackageScope {
            package_id: PackageId::new(),
            package: "pkg".to_string(),
            dest: dest.to_string(),
            registry,
            host: HostServices::local(BootPolicy::Legacy)
                .with_env(Arc::new(MemoryEnvStore::new())),
            audit: audit.clone(),
            lifecycle: dispatcher.handle(),
        };
        (PackageUtils::new(Arc::new(scope)), audit)
    }

    #[test]
    fn test_resolve_path_under_dest() {
        let (utils, _) = utils_with(PermissionRegistry::new(), "/opt/pkg");
        assert_eq!(utils.resolve_path("bin/tool"), "/opt/pkg/bin/tool");
        assert_eq!(utils.resolve_path("../shared"), "/opt/shared");
        assert_eq!(utils.resolve_path("/etc/hosts"), "/etc/hosts");
    }

    #[tokio::test]
    async fn test_denied_read_is_audited() {
        let registry = PermissionRegistry::builder()
            .prompter(StaticPrompter::deny_all())
            .build();
        let (utils, audit) = utils_with(registry, "/opt/pkg");

        let err = utils.fs_exist("config.json").await.unwrap_err();
        assert!(err.is_permission_denied());

        let entries = audit.entries_for(&utils.package_id());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "fs_exist");
        assert_eq!(
            entries[0].descriptor,
            Some(PermissionDescriptor::read("/opt/pkg/config.json"))
        );
        assert!(!entries[0].permitted);
    }

    #[tokio::test]
    async fn test_log_needs_explicit_grant() {
        let registry = PermissionRegistry::new();
        let (utils, _) = utils_with(registry.clone(), "/opt/pkg");

        assert!(!utils.log(LogLevel::Info, "dropped"));
        registry.restore(&PermissionDescriptor::Log, PermissionState::Granted);
        assert!(utils.log(LogLevel::Info, "written"));
    }

    #[tokio::test]
    async fn test_register_hook_resolves_relative_locator() {
        let registry = PermissionRegistry::builder()
            .prompter(StaticPrompter::allow_all())
            .build();
        let (utils, audit) = utils_with(registry, "/opt/pkg");

        assert!(utils
            .register_hook(LifecycleStage::OsPostShell, "hooks/late.js")
            .await
            .unwrap());
        assert!(!utils
            .register_hook(LifecycleStage::OsPostShell, "./hooks/late.js")
            .await
            .unwrap());

        assert_eq!(
            utils.list_hooks(LifecycleStage::OsPostShell),
            vec![HookSource::parse("/opt/pkg/hooks/late.js").unwrap()]
        );
        assert!(utils
            .unregister_hook(LifecycleStage::OsPostShell, "/opt/pkg/hooks/late.js")
            .await
            .unwrap());
        assert!(audit
            .entries_for(&utils.package_id())
            .iter()
            .all(|e| e.permitted));
    }

    #[tokio::test]
    async fn test_extension_permissions() {
        let registry = PermissionRegistry::builder()
            .prompter(StaticPrompter::allow_all())
            .build();
        let (utils, _) = utils_with(registry, "/opt/pkg");
        let permissions = utils.permissions();
        let net = PermissionDescriptor::net("example.org");

        assert_eq!(permissions.query(&net), PermissionState::Prompt);
        assert_eq!(
            permissions.request(&net).await.unwrap(),
            PermissionState::Granted
        );

        let mut status = permissions.subscribe(&net);
        assert_eq!(status.state(), PermissionState::Granted);
        assert_eq!(permissions.revoke(&net).await, PermissionState::Denied);
        let change = status.changed().await.unwrap();
        assert_eq!(change.current, PermissionState::Denied);
    }
}
