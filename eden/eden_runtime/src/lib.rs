//! Eden Runtime - boot runtime of the Eden extension host
//!
//! This crate wires the permission registry, the lifecycle dispatcher and
//! the plugin execution boundary into one [`Runtime`], and provides the host
//! collaborators and the configuration they are built from.

pub mod host;
pub mod plugin;
pub mod system;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use eden_core::types::{LifecycleStage, PermissionState};
use eden_core::utils::path;
use eden_lifecycle::{AdvanceError, HookExecutor, LifecycleDispatcher, StageReport};
use eden_permission::{
    DecisionStore, InMemoryDecisionStore, JsonFileDecisionStore, PermissionPrompter,
    PermissionRegistry,
};

use host::HostServices;
use plugin::{AuditLog, ExtensionLoader, PluginBoundary, StaticExtensionLoader};
use system::{BootError, RuntimeConfig};

/// Runtime facade that provides a unified interface to the Eden host.
pub struct Runtime {
    /// Validated configuration the runtime was built from
    pub config: RuntimeConfig,

    /// Permission registry shared by every extension
    pub permissions: PermissionRegistry,

    /// Lifecycle dispatcher driving the boot sequence
    pub lifecycle: Arc<LifecycleDispatcher>,

    /// Boundary running extension code for the dispatcher
    pub boundary: Arc<PluginBoundary>,

    /// Host collaborators
    pub host: HostServices,

    /// Audit trail of extension utility calls
    pub audit: AuditLog,
}

impl Runtime {
    /// Create a new Runtime instance from a configuration file
    pub async fn new(config_path: Option<&str>) -> Result<Self> {
        let config = RuntimeConfig::load(config_path).await?;
        Self::builder(config).build().await
    }

    /// Start wiring a runtime from `config`
    pub fn builder(config: RuntimeConfig) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            loader: None,
            prompter: None,
            host: None,
            store: None,
            audit: None,
        }
    }

    /// Register the hooks listed in the configuration
    ///
    /// Returns the number of hooks that were not registered already.
    pub fn register_configured_hooks(&self) -> Result<usize> {
        let mut added = 0;
        for (stage, source) in self.config.hook_sources()? {
            if self.lifecycle.register(stage, source) {
                added += 1;
            }
        }
        info!(count = added, "Registered configured hooks");
        Ok(added)
    }

    /// Enter `stage`
    pub async fn advance(&self, stage: LifecycleStage) -> std::result::Result<StageReport, AdvanceError> {
        self.lifecycle.advance(stage).await
    }

    /// Advance through every remaining stage in order
    ///
    /// Stops at the first refused advance or failing gating stage.
    pub async fn boot(&self) -> std::result::Result<Vec<StageReport>, BootError> {
        info!("Starting boot sequence");
        let mut completed = Vec::new();

        while let Some(stage) = self.lifecycle.next_stage() {
            match self.lifecycle.advance(stage).await {
                Ok(report) => {
                    info!(
                        %stage,
                        hooks = report.outcomes.len(),
                        failed = report.failure_count(),
                        "Stage complete"
                    );
                    completed.push(report);
                }
                Err(AdvanceError::GatingFailed(report)) => {
                    warn!(%stage, failed = report.failure_count(), "Gating stage failed, halting boot");
                    return Err(BootError::GatingFailed { completed, report });
                }
                Err(AdvanceError::Rejected(error)) => {
                    warn!(%stage, %error, "Advance refused, halting boot");
                    return Err(BootError::Rejected { completed, error });
                }
            }
        }

        info!(stages = completed.len(), "Boot sequence finished");
        Ok(completed)
    }
}

/// Wires a [`Runtime`] from configuration and optional collaborators.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    loader: Option<Arc<dyn ExtensionLoader>>,
    prompter: Option<Arc<dyn PermissionPrompter>>,
    host: Option<HostServices>,
    store: Option<Arc<dyn DecisionStore>>,
    audit: Option<AuditLog>,
}

impl RuntimeBuilder {
    /// Where extension code comes from. Defaults to an empty catalogue.
    pub fn loader(mut self, loader: Arc<dyn ExtensionLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Who resolves permission prompts. Without one, prompts are unresolvable.
    pub fn prompter(mut self, prompter: Arc<dyn PermissionPrompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Host collaborators. Defaults to the local machine.
    pub fn host(mut self, host: HostServices) -> Self {
        self.host = Some(host);
        self
    }

    /// Decision store, overriding `permissions.store` in the configuration.
    pub fn store(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Audit log to record utility calls in.
    pub fn audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Build the runtime
    pub async fn build(self) -> Result<Runtime> {
        let config = self.config;
        config.validate()?;

        let store: Arc<dyn DecisionStore> = match (self.store, &config.permissions.store) {
            (Some(store), _) => store,
            (None, Some(file)) => {
                let file = path::resolve(&config.bootstrap.location, file);
                info!(store = %file, "Persisting permission decisions to file");
                Arc::new(JsonFileDecisionStore::new(file))
            }
            (None, None) => Arc::new(InMemoryDecisionStore::new()),
        };

        let mut registry = PermissionRegistry::builder().store(store);
        if let Some(prompter) = self.prompter {
            registry = registry.shared_prompter(prompter);
        }
        let permissions = registry.build();

        permissions
            .load_decisions()
            .await
            .context("Failed to load persisted permission decisions")?;
        // Configured decisions take precedence over persisted ones
        for descriptor in &config.permissions.allow {
            permissions.restore(descriptor, PermissionState::Granted);
        }
        for descriptor in &config.permissions.deny {
            permissions.restore(descriptor, PermissionState::Denied);
        }

        let host = self
            .host
            .unwrap_or_else(|| HostServices::local(config.bootstrap.boot_policy));
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(StaticExtensionLoader::new()) as Arc<dyn ExtensionLoader>);
        let audit = self.audit.unwrap_or_default();

        let boundary = Arc::new(PluginBoundary::new(
            loader,
            permissions.clone(),
            host.clone(),
            audit.clone(),
            config.bootstrap.clone(),
            config.packages.clone(),
        ));
        let lifecycle = Arc::new(LifecycleDispatcher::new(
            config.dispatcher.clone(),
            Arc::clone(&boundary) as Arc<dyn HookExecutor>,
        ));
        boundary.attach_lifecycle(lifecycle.handle());

        info!("Eden runtime initialized");

        Ok(Runtime {
            config,
            permissions,
            lifecycle,
            boundary,
            host,
            audit,
        })
    }
}
