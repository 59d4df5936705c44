//! Host collaborators.
//!
//! The boundary never touches the machine directly. File-system probes,
//! process and window probes, the system inventory and the environment are
//! reached through the traits below, bundled in [`HostServices`].

pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use eden_core::error::PluginError;
use eden_core::types::BootPolicy;

pub use local::LocalHost;
pub use memory::MemoryEnvStore;

/// Result of a `stat` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    /// Last path segment
    pub name: String,

    /// Regular file
    pub is_file: bool,

    /// Directory
    pub is_directory: bool,
}

/// Static description of the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// CPU architecture (`x86_64`, `aarch64`, ...)
    pub arch: String,

    /// Operating system (`linux`, `windows`, ...)
    pub os: String,

    /// OS family (`unix`, `windows`)
    pub family: String,
}

/// Inventory returned by the system probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// Platform triple parts
    pub platform: Platform,

    /// Host name, if known
    pub hostname: Option<String>,

    /// Kernel version, if known
    pub kernel_version: Option<String>,

    /// Logical processors available to the host
    pub processors: usize,

    /// Total physical memory in bytes, if known
    pub total_memory: Option<u64>,

    /// Firmware boot mode
    pub boot_policy: BootPolicy,
}

/// File-system probes.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Whether `path` exists.
    async fn exists(&self, path: &str) -> Result<bool, PluginError>;

    /// Metadata of `path`, `None` if it does not exist.
    async fn stat(&self, path: &str) -> Result<Option<Stat>, PluginError>;
}

/// Process probe.
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    /// Whether a process called `name` is running.
    async fn is_alive(&self, name: &str) -> Result<bool, PluginError>;
}

/// Window probe.
#[async_trait]
pub trait WindowProbe: Send + Sync {
    /// Whether a window titled `name` is visible.
    async fn is_visible(&self, name: &str) -> Result<bool, PluginError>;
}

/// System inventory.
#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// Collect the current inventory.
    async fn system_info(&self) -> Result<SystemInfo, PluginError>;
}

/// Host environment variable storage.
pub trait EnvStore: Send + Sync {
    /// All variables.
    fn vars(&self) -> Vec<(String, String)>;

    /// One variable.
    fn get(&self, name: &str) -> Option<String>;

    /// Set a variable for the whole host.
    fn set(&self, name: &str, value: &str) -> Result<(), PluginError>;
}

/// The collaborators a runtime is wired with.
#[derive(Clone)]
pub struct HostServices {
    /// File-system probes
    pub fs: Arc<dyn FileSystem>,

    /// Process probe
    pub processes: Arc<dyn ProcessProbe>,

    /// Window probe
    pub windows: Arc<dyn WindowProbe>,

    /// System inventory
    pub system: Arc<dyn SystemProbe>,

    /// Environment storage
    pub env: Arc<dyn EnvStore>,
}

impl HostServices {
    /// Every collaborator backed by the current machine.
    pub fn local(boot_policy: BootPolicy) -> Self {
        let host = Arc::new(LocalHost::new(boot_policy));
        Self {
            fs: host.clone(),
            processes: host.clone(),
            windows: host.clone(),
            system: host.clone(),
            env: host,
        }
    }

    /// Replace the environment store.
    pub fn with_env(mut self, env: Arc<dyn EnvStore>) -> Self {
        self.env = env;
        self
    }

    /// Replace the process probe.
    pub fn with_processes(mut self, processes: Arc<dyn ProcessProbe>) -> Self {
        self.processes = processes;
        self
    }

    /// Replace the window probe.
    pub fn with_windows(mut self, windows: Arc<dyn WindowProbe>) -> Self {
        self.windows = windows;
        self
    }
}
