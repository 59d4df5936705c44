//! Collaborators backed by the machine the host runs on.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::debug;

use eden_core::error::PluginError;
use eden_core::types::BootPolicy;
use eden_core::utils::path;

use super::{
    EnvStore, FileSystem, MemoryEnvStore, Platform, ProcessProbe, Stat, SystemInfo, SystemProbe,
    WindowProbe,
};

/// The current machine.
///
/// Process probing scans `/proc` and only works on Linux; window probing
/// needs a window system the host does not link against and is reported as
/// unsupported.
///
/// The process environment is read once, at construction. Host-wide writes
/// land in an in-process copy that every later hook sees; the process
/// environment itself is never mutated while hooks run on worker threads.
#[derive(Debug, Clone)]
pub struct LocalHost {
    boot_policy: BootPolicy,
    env: Arc<MemoryEnvStore>,
}

impl LocalHost {
    /// Create a local host reporting `boot_policy` in its inventory.
    pub fn new(boot_policy: BootPolicy) -> Self {
        Self {
            boot_policy,
            env: Arc::new(MemoryEnvStore::with_vars(std::env::vars())),
        }
    }
}

fn host_error(context: &str, error: std::io::Error) -> PluginError {
    PluginError::Host(format!("{}: {}", context, error))
}

#[async_trait]
impl FileSystem for LocalHost {
    async fn exists(&self, path: &str) -> Result<bool, PluginError> {
        match tokio::fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(host_error(&format!("Failed to probe {}", path), e)),
        }
    }

    async fn stat(&self, target: &str) -> Result<Option<Stat>, PluginError> {
        match tokio::fs::metadata(target).await {
            Ok(metadata) => Ok(Some(Stat {
                name: path::file_name(&path::normalize_path(target))
                    .unwrap_or(target)
                    .to_string(),
                is_file: metadata.is_file(),
                is_directory: metadata.is_dir(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(host_error(&format!("Failed to stat {}", target), e)),
        }
    }
}

/// Compare process names the way users write them (`Explorer.exe`, `explorer`).
fn process_name_matches(candidate: &str, wanted: &str) -> bool {
    let strip = |name: &str| {
        let lower = name.trim().to_lowercase();
        lower.strip_suffix(".exe").map(str::to_string).unwrap_or(lower)
    };
    strip(candidate) == strip(wanted)
}

#[async_trait]
impl ProcessProbe for LocalHost {
    async fn is_alive(&self, name: &str) -> Result<bool, PluginError> {
        if !cfg!(target_os = "linux") {
            return Err(PluginError::Host(
                "process probing is not supported on this platform".to_string(),
            ));
        }

        let mut entries = tokio::fs::read_dir("/proc")
            .await
            .map_err(|e| host_error("Failed to list /proc", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| host_error("Failed to read /proc", e))?
        {
            let file_name = entry.file_name();
            let Some(pid) = file_name.to_str() else {
                continue;
            };
            if !pid.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            // Processes can exit between listing and reading
            if let Ok(comm) = tokio::fs::read_to_string(entry.path().join("comm")).await {
                if process_name_matches(&comm, name) {
                    debug!(%name, %pid, "Process found");
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

#[async_trait]
impl WindowProbe for LocalHost {
    async fn is_visible(&self, _name: &str) -> Result<bool, PluginError> {
        Err(PluginError::Host(
            "window probing is not supported by the local host".to_string(),
        ))
    }
}

async fn read_trimmed(file: &str) -> Option<String> {
    tokio::fs::read_to_string(file)
        .await
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn total_memory() -> Option<u64> {
    let meminfo = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}

#[async_trait]
impl SystemProbe for LocalHost {
    async fn system_info(&self) -> Result<SystemInfo, PluginError> {
        let hostname = match read_trimmed("/proc/sys/kernel/hostname").await {
            Some(name) => Some(name),
            None => self.env.get("COMPUTERNAME").or_else(|| self.env.get("HOSTNAME")),
        };

        Ok(SystemInfo {
            platform: Platform {
                arch: std::env::consts::ARCH.to_string(),
                os: std::env::consts::OS.to_string(),
                family: std::env::consts::FAMILY.to_string(),
            },
            hostname,
            kernel_version: read_trimmed("/proc/sys/kernel/osrelease").await,
            processors: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            total_memory: total_memory().await,
            boot_policy: self.boot_policy,
        })
    }
}

impl EnvStore for LocalHost {
    fn vars(&self) -> Vec<(String, String)> {
        self.env.vars()
    }

    fn get(&self, name: &str) -> Option<String> {
        self.env.get(name)
    }

    fn set(&self, name: &str, value: &str) -> Result<(), PluginError> {
        if name.is_empty() || name.contains('=') || name.contains('\0') || value.contains('\0') {
            return Err(PluginError::Host(format!(
                "Invalid environment variable name or value: {}",
                name
            )));
        }
        debug!(name, "Host environment variable set");
        self.env.set(name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fs_probes() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();

        let host = LocalHost::new(BootPolicy::Legacy);
        let file_path = file.to_string_lossy().to_string();
        assert!(host.exists(&file_path).await.unwrap());

        let stat = host.stat(&file_path).await.unwrap().unwrap();
        assert_eq!(stat.name, "a.txt");
        assert!(stat.is_file);
        assert!(!stat.is_directory);

        let missing = dir.path().join("missing").to_string_lossy().to_string();
        assert!(!host.exists(&missing).await.unwrap());
        assert_eq!(host.stat(&missing).await.unwrap(), None);
    }

    #[test]
    fn test_process_name_matching() {
        assert!(process_name_matches("explorer\n", "Explorer.exe"));
        assert!(process_name_matches("pecmd.exe", "PECMD"));
        assert!(!process_name_matches("explorer", "explore"));
    }

    #[tokio::test]
    async fn test_system_info_reports_platform() {
        let info = LocalHost::new(BootPolicy::Uefi).system_info().await.unwrap();
        assert_eq!(info.platform.os, std::env::consts::OS);
        assert!(info.processors >= 1);
        assert_eq!(info.boot_policy, BootPolicy::Uefi);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_env_writes_stay_in_process() {
        let host = LocalHost::new(BootPolicy::Legacy);
        let name = "EDEN_LOCAL_HOST_TEST_VAR";

        host.set(name, "1").unwrap();
        assert_eq!(host.get(name), Some("1".to_string()));
        assert!(host.vars().iter().any(|(k, v)| k == name && v == "1"));
        assert!(std::env::var(name).is_err());

        // Clones share the host-wide environment
        let clone = host.clone();
        clone.set(name, "2").unwrap();
        assert_eq!(host.get(name), Some("2".to_string()));

        assert!(host.set("A=B", "x").is_err());
        assert!(host.set("", "x").is_err());
    }

    #[tokio::test]
    async fn test_window_probe_is_unsupported() {
        let host = LocalHost::new(BootPolicy::Legacy);
        assert!(matches!(
            host.is_visible("Desktop").await,
            Err(PluginError::Host(_))
        ));
    }
}
