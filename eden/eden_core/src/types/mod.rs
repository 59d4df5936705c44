//! Core data types shared by every Eden subsystem.

pub mod bootstrap;
pub mod descriptor;
pub mod locator;
pub mod package;
pub mod stage;

pub use bootstrap::{BootPolicy, BootstrapData};
pub use descriptor::{PermissionDescriptor, PermissionKind};
pub use locator::HookSource;
pub use package::{PackageLoadOptions, PackageOptions, PackageType};
pub use stage::LifecycleStage;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision state of a permission record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Operations on the descriptor proceed
    Granted,

    /// Operations on the descriptor fail with a permission error
    Denied,

    /// No decision yet; a request will ask the prompter
    #[default]
    Prompt,
}

impl PermissionState {
    /// Whether this is a final decision (`granted` or `denied`).
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Prompt)
    }

    /// Lower-case literal.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Prompt => "prompt",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
