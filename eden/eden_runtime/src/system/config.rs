//! Configuration for the Eden runtime
//!
//! Handles loading, validating and merging runtime configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use eden_core::types::{BootstrapData, HookSource, LifecycleStage, PermissionDescriptor};
use eden_core::utils::{path, LogLevel, Version};
use eden_lifecycle::DispatcherConfig;

/// Errors that can occur in configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Decisions known before any prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Descriptors granted at startup
    #[serde(default)]
    pub allow: Vec<PermissionDescriptor>,

    /// Descriptors denied at startup
    #[serde(default)]
    pub deny: Vec<PermissionDescriptor>,

    /// JSON file decisions are persisted to; in memory when absent
    #[serde(default)]
    pub store: Option<String>,
}

/// How the host loads one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Install directory, relative paths against the bootstrap location.
    /// Defaults to the directory of the hook source.
    #[serde(default)]
    pub dest: Option<String>,

    /// Loaded by the local boost step
    #[serde(default)]
    pub localboost: bool,

    /// User policy applied to the package
    #[serde(default)]
    pub user_policy: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level written
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub structured: bool,
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Boot environment facts
    #[serde(default = "default_bootstrap")]
    pub bootstrap: BootstrapData,

    /// Dispatcher settings
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Startup permission decisions
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Per-package load options, keyed by package name
    #[serde(default)]
    pub packages: BTreeMap<String, PackageConfig>,

    /// Hooks registered at startup, relative locators against the bootstrap location
    #[serde(default)]
    pub hooks: BTreeMap<LifecycleStage, Vec<String>>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_bootstrap() -> BootstrapData {
    let location = std::env::current_dir()
        .map(|dir| path::normalize_path(&dir.to_string_lossy()))
        .unwrap_or_else(|_| "/".to_string());

    BootstrapData {
        location,
        version: env!("CARGO_PKG_VERSION").to_string(),
        ..BootstrapData::default()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bootstrap: default_bootstrap(),
            dispatcher: DispatcherConfig::default(),
            permissions: PermissionsConfig::default(),
            packages: BTreeMap::new(),
            hooks: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a file
    pub async fn load(path: Option<&str>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path);

                if !Path::new(path).exists() {
                    return Err(ConfigError::LoadFailed(format!(
                        "Configuration file not found: {}",
                        path
                    ))
                    .into());
                }

                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read configuration file: {}", path))?;

                Self::from_json(&content)
                    .context(format!("Failed to parse configuration file: {}", path))?
            }
            None => {
                info!("No configuration file specified, using defaults");
                RuntimeConfig::default()
            }
        };

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from JSON text, without validating it
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()).into())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let location = path::normalize_path(&self.bootstrap.location);
        if location.is_empty() {
            return Err(
                ConfigError::Invalid("Bootstrap location cannot be empty".to_string()).into(),
            );
        }
        if !path::is_absolute(&location) {
            return Err(ConfigError::Invalid(format!(
                "Bootstrap location must be absolute: {}",
                self.bootstrap.location
            ))
            .into());
        }

        if self.bootstrap.version.parse::<Version>().is_err() {
            warn!(
                "Host version {} is not a semantic version; package compatibility will not be checked",
                self.bootstrap.version
            );
        }

        self.dispatcher
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let allowed: BTreeSet<PermissionDescriptor> = self
            .permissions
            .allow
            .iter()
            .map(PermissionDescriptor::normalize)
            .collect();
        if let Some(conflict) = self
            .permissions
            .deny
            .iter()
            .map(PermissionDescriptor::normalize)
            .find(|d| allowed.contains(d))
        {
            return Err(ConfigError::Invalid(format!(
                "Permission {} is both allowed and denied",
                conflict
            ))
            .into());
        }

        if let Some(store) = &self.permissions.store {
            if store.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "Permission store path cannot be empty".to_string(),
                )
                .into());
            }
        }

        for (name, package) in &self.packages {
            if package.dest.as_deref().is_some_and(|d| d.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "Package {} has an empty dest directory",
                    name
                ))
                .into());
            }
        }

        for (stage, locators) in &self.hooks {
            for locator in locators {
                HookSource::resolve(&location, locator).map_err(|e| {
                    ConfigError::Invalid(format!("Hook for {}: {}", stage, e))
                })?;
            }
        }

        Ok(())
    }

    /// Configured hooks, normalized, in stage order
    pub fn hook_sources(&self) -> Result<Vec<(LifecycleStage, HookSource)>> {
        let mut sources = Vec::new();
        for (stage, locators) in &self.hooks {
            for locator in locators {
                let source = HookSource::resolve(&self.bootstrap.location, locator)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                sources.push((*stage, source));
            }
        }
        Ok(sources)
    }

    /// Merge with another configuration
    pub fn merge(&mut self, other: RuntimeConfig) {
        self.bootstrap = other.bootstrap;

        if other.dispatcher != DispatcherConfig::default() {
            self.dispatcher = other.dispatcher;
        }

        // Later decisions override earlier ones for the same descriptor
        for descriptor in other.permissions.allow {
            let key = descriptor.normalize();
            self.permissions.deny.retain(|d| d.normalize() != key);
            if !self.permissions.allow.iter().any(|d| d.normalize() == key) {
                self.permissions.allow.push(descriptor);
            }
        }
        for descriptor in other.permissions.deny {
            let key = descriptor.normalize();
            self.permissions.allow.retain(|d| d.normalize() != key);
            if !self.permissions.deny.iter().any(|d| d.normalize() == key) {
                self.permissions.deny.push(descriptor);
            }
        }
        if other.permissions.store.is_some() {
            self.permissions.store = other.permissions.store;
        }

        for (name, package) in other.packages {
            self.packages.insert(name, package);
        }

        for (stage, locators) in other.hooks {
            let existing = self.hooks.entry(stage).or_default();
            for locator in locators {
                if !existing.contains(&locator) {
                    existing.push(locator);
                }
            }
        }

        if other.logging != LoggingConfig::default() {
            self.logging = other.logging;
        }
    }
}
