//! Permission descriptors.
//!
//! A descriptor names a protectable resource class and, for some kinds, a
//! scope inside it (a path, a host, a command, a variable). Descriptors are
//! serialized as JSON objects tagged by `name`, e.g.
//! `{"name": "read", "path": "/etc/passwd"}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::locator::normalize_locator;
use crate::utils::path::{ancestors, normalize_path};

/// Kinds of permission descriptor, without their scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionKind {
    /// Spawn a command
    Run,
    /// Read from the file system
    Read,
    /// Write to the file system
    Write,
    /// Read or write environment variables
    Env,
    /// Open network connections
    Net,
    /// Inspect processes, windows and hardware inventory
    QuerySystemInfo,
    /// Load further packages
    LoadPackages,
    /// Control the host system (reboot, shutdown)
    SystemCtl,
    /// Register lifecycle hooks
    LifecycleHook,
    /// Enumerate installed packages
    QueryPackages,
    /// Write to the host log
    Log,
    /// Show transient tips
    DynamicTip,
    /// Show message boxes
    DynamicMsgbox,
}

impl PermissionKind {
    /// Every kind, in declaration order.
    pub const ALL: [PermissionKind; 13] = [
        Self::Run,
        Self::Read,
        Self::Write,
        Self::Env,
        Self::Net,
        Self::QuerySystemInfo,
        Self::LoadPackages,
        Self::SystemCtl,
        Self::LifecycleHook,
        Self::QueryPackages,
        Self::Log,
        Self::DynamicTip,
        Self::DynamicMsgbox,
    ];

    /// The `name` literal of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Read => "read",
            Self::Write => "write",
            Self::Env => "env",
            Self::Net => "net",
            Self::QuerySystemInfo => "query-system-info",
            Self::LoadPackages => "load-packages",
            Self::SystemCtl => "system-ctl",
            Self::LifecycleHook => "lifecycle-hook",
            Self::QueryPackages => "query-packages",
            Self::Log => "log",
            Self::DynamicTip => "dynamic-tip",
            Self::DynamicMsgbox => "dynamic-msgbox",
        }
    }

    /// Name of the scope field, for kinds that have one.
    pub fn scope_field(&self) -> Option<&'static str> {
        match self {
            Self::Run => Some("command"),
            Self::Read | Self::Write | Self::LifecycleHook => Some("path"),
            Self::Env => Some("variable"),
            Self::Net => Some("host"),
            Self::QuerySystemInfo
            | Self::LoadPackages
            | Self::SystemCtl
            | Self::QueryPackages
            | Self::Log
            | Self::DynamicTip
            | Self::DynamicMsgbox => None,
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown permission kind: {0}")]
pub struct UnknownPermissionKind(pub String);

impl FromStr for PermissionKind {
    type Err = UnknownPermissionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| UnknownPermissionKind(s.to_string()))
    }
}

/// A typed identifier of a protectable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum PermissionDescriptor {
    /// Spawn `command`, or any command when unscoped
    Run {
        /// Command name or path
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },

    /// Read `path`, or anything when unscoped
    Read {
        /// File or directory
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Write `path`, or anything when unscoped
    Write {
        /// File or directory
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Access `variable`, or the whole environment when unscoped
    Env {
        /// Variable name
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variable: Option<String>,
    },

    /// Connect to `host`, or anywhere when unscoped
    Net {
        /// Host name, optionally with `:port`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
    },

    /// Inspect processes, windows and hardware
    QuerySystemInfo,

    /// Load further packages
    LoadPackages,

    /// Control the host system
    SystemCtl,

    /// Register hooks pointing at `path`, or anywhere when unscoped
    LifecycleHook {
        /// Hook locator
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Enumerate installed packages
    QueryPackages,

    /// Write to the host log
    Log,

    /// Show transient tips
    DynamicTip,

    /// Show message boxes
    DynamicMsgbox,
}

impl PermissionDescriptor {
    /// `run` scoped to a command.
    pub fn run(command: impl Into<String>) -> Self {
        Self::Run {
            command: Some(command.into()),
        }
        .normalize()
    }

    /// `read` scoped to a path.
    pub fn read(path: impl Into<String>) -> Self {
        Self::Read {
            path: Some(path.into()),
        }
        .normalize()
    }

    /// `write` scoped to a path.
    pub fn write(path: impl Into<String>) -> Self {
        Self::Write {
            path: Some(path.into()),
        }
        .normalize()
    }

    /// `env` scoped to a variable.
    pub fn env(variable: impl Into<String>) -> Self {
        Self::Env {
            variable: Some(variable.into()),
        }
        .normalize()
    }

    /// `net` scoped to a host.
    pub fn net(host: impl Into<String>) -> Self {
        Self::Net {
            host: Some(host.into()),
        }
        .normalize()
    }

    /// `lifecycle-hook` scoped to a locator.
    pub fn lifecycle_hook(path: impl Into<String>) -> Self {
        Self::LifecycleHook {
            path: Some(path.into()),
        }
        .normalize()
    }

    /// The unscoped descriptor of `kind`.
    pub fn unscoped_of(kind: PermissionKind) -> Self {
        match kind {
            PermissionKind::Run => Self::Run { command: None },
            PermissionKind::Read => Self::Read { path: None },
            PermissionKind::Write => Self::Write { path: None },
            PermissionKind::Env => Self::Env { variable: None },
            PermissionKind::Net => Self::Net { host: None },
            PermissionKind::QuerySystemInfo => Self::QuerySystemInfo,
            PermissionKind::LoadPackages => Self::LoadPackages,
            PermissionKind::SystemCtl => Self::SystemCtl,
            PermissionKind::LifecycleHook => Self::LifecycleHook { path: None },
            PermissionKind::QueryPackages => Self::QueryPackages,
            PermissionKind::Log => Self::Log,
            PermissionKind::DynamicTip => Self::DynamicTip,
            PermissionKind::DynamicMsgbox => Self::DynamicMsgbox,
        }
    }

    /// The kind of this descriptor.
    pub fn kind(&self) -> PermissionKind {
        match self {
            Self::Run { .. } => PermissionKind::Run,
            Self::Read { .. } => PermissionKind::Read,
            Self::Write { .. } => PermissionKind::Write,
            Self::Env { .. } => PermissionKind::Env,
            Self::Net { .. } => PermissionKind::Net,
            Self::QuerySystemInfo => PermissionKind::QuerySystemInfo,
            Self::LoadPackages => PermissionKind::LoadPackages,
            Self::SystemCtl => PermissionKind::SystemCtl,
            Self::LifecycleHook { .. } => PermissionKind::LifecycleHook,
            Self::QueryPackages => PermissionKind::QueryPackages,
            Self::Log => PermissionKind::Log,
            Self::DynamicTip => PermissionKind::DynamicTip,
            Self::DynamicMsgbox => PermissionKind::DynamicMsgbox,
        }
    }

    /// The scope value, if this descriptor carries one.
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::Run { command: scope }
            | Self::Read { path: scope }
            | Self::Write { path: scope }
            | Self::Env { variable: scope }
            | Self::Net { host: scope }
            | Self::LifecycleHook { path: scope } => scope.as_deref(),
            Self::QuerySystemInfo
            | Self::LoadPackages
            | Self::SystemCtl
            | Self::QueryPackages
            | Self::Log
            | Self::DynamicTip
            | Self::DynamicMsgbox => None,
        }
    }

    /// Whether this descriptor is the unscoped one of its kind.
    pub fn is_unscoped(&self) -> bool {
        self.scope().is_none()
    }

    /// The same kind without a scope.
    pub fn unscoped(&self) -> Self {
        Self::unscoped_of(self.kind())
    }

    /// Canonical form used as the registry key.
    ///
    /// Normalization is total, deterministic and idempotent.
    pub fn normalize(&self) -> Self {
        match self {
            Self::Run { command } => Self::Run {
                command: command.as_deref().map(normalize_command),
            },
            Self::Read { path } => Self::Read {
                path: path.as_deref().map(normalize_path),
            },
            Self::Write { path } => Self::Write {
                path: path.as_deref().map(normalize_path),
            },
            Self::Env { variable } => Self::Env {
                variable: variable.as_deref().map(normalize_variable),
            },
            Self::Net { host } => Self::Net {
                host: host.as_deref().map(normalize_host),
            },
            Self::LifecycleHook { path } => Self::LifecycleHook {
                path: path.as_deref().map(normalize_locator),
            },
            Self::QuerySystemInfo
            | Self::LoadPackages
            | Self::SystemCtl
            | Self::QueryPackages
            | Self::Log
            | Self::DynamicTip
            | Self::DynamicMsgbox => self.clone(),
        }
    }

    /// Strictly broader descriptors, nearest first.
    ///
    /// For file-system kinds these are the ancestor directories followed by
    /// the unscoped descriptor; `net` with a port is covered by the bare
    /// host. Unscoped descriptors have nothing broader. Expects `self` to
    /// be normalized.
    pub fn broader(&self) -> Vec<Self> {
        let Some(scope) = self.scope() else {
            return Vec::new();
        };

        let mut result = Vec::new();
        match self {
            Self::Read { .. } => {
                result.extend(ancestors(scope).into_iter().map(|p| Self::Read { path: Some(p) }))
            }
            Self::Write { .. } => {
                result.extend(ancestors(scope).into_iter().map(|p| Self::Write { path: Some(p) }))
            }
            Self::Net { .. } => {
                if let Some((host, port)) = scope.rsplit_once(':') {
                    if !host.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
                        result.push(Self::Net {
                            host: Some(host.to_string()),
                        });
                    }
                }
            }
            Self::Run { .. }
            | Self::Env { .. }
            | Self::LifecycleHook { .. }
            | Self::QuerySystemInfo
            | Self::LoadPackages
            | Self::SystemCtl
            | Self::QueryPackages
            | Self::Log
            | Self::DynamicTip
            | Self::DynamicMsgbox => {}
        }
        result.push(self.unscoped());
        result
    }
}

impl fmt::Display for PermissionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope() {
            Some(scope) => write!(f, "{}({})", self.kind(), scope),
            None => write!(f, "{}", self.kind()),
        }
    }
}

fn normalize_command(command: &str) -> String {
    let trimmed = command.trim();
    if trimmed.contains('/') || trimmed.contains('\\') {
        normalize_path(trimmed)
    } else {
        trimmed.to_string()
    }
}

fn normalize_variable(variable: &str) -> String {
    let trimmed = variable.trim();
    // Windows environment names are case-insensitive
    if cfg!(windows) {
        trimmed.to_uppercase()
    } else {
        trimmed.to_string()
    }
}

fn normalize_host(host: &str) -> String {
    let lowered = host.trim().to_lowercase();
    match lowered.rsplit_once(':') {
        Some((name, port))
            if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            format!("{}:{}", name.trim_end_matches('.'), port)
        }
        _ => lowered.trim_end_matches('.').to_string(),
    }
}
