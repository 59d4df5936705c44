//! The fixed boot sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LifecycleError;

/// A point in host startup at which extension hooks run.
///
/// Stages are totally ordered by their position in [`LifecycleStage::ALL`];
/// the derived `Ord` follows declaration order and therefore agrees with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStage {
    OsStartup,
    UserDrivesSorted,
    UserDrivesFound,
    OsInit,
    UserConfigLoaded,
    OsLoadShell,
    OsPostShell,
    UserBeforeLocalboost,
    UserBeforeLoad,
    UserLoading,
    UserPostLoad,
    OsBootFinished,
}

impl LifecycleStage {
    /// Every stage, in boot order.
    pub const ALL: [LifecycleStage; 12] = [
        Self::OsStartup,
        Self::UserDrivesSorted,
        Self::UserDrivesFound,
        Self::OsInit,
        Self::UserConfigLoaded,
        Self::OsLoadShell,
        Self::OsPostShell,
        Self::UserBeforeLocalboost,
        Self::UserBeforeLoad,
        Self::UserLoading,
        Self::UserPostLoad,
        Self::OsBootFinished,
    ];

    /// The first stage of the boot sequence.
    pub fn first() -> Self {
        Self::OsStartup
    }

    /// The final stage of the boot sequence.
    pub fn last() -> Self {
        Self::OsBootFinished
    }

    /// Position in the boot sequence, starting at zero.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The stage that must follow this one, if any.
    pub fn successor(&self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The literal used in configuration and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OsStartup => "os-startup",
            Self::UserDrivesSorted => "user-drives-sorted",
            Self::UserDrivesFound => "user-drives-found",
            Self::OsInit => "os-init",
            Self::UserConfigLoaded => "user-config-loaded",
            Self::OsLoadShell => "os-load-shell",
            Self::OsPostShell => "os-post-shell",
            Self::UserBeforeLocalboost => "user-before-localboost",
            Self::UserBeforeLoad => "user-before-load",
            Self::UserLoading => "user-loading",
            Self::UserPostLoad => "user-post-load",
            Self::OsBootFinished => "os-boot-finished",
        }
    }

    /// Stages after `current`, in order. `None` yields the whole sequence.
    pub fn remaining_after(current: Option<Self>) -> impl Iterator<Item = Self> {
        let start = current.map_or(0, |stage| stage.index() + 1);
        Self::ALL.into_iter().skip(start)
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStage {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s.trim())
            .ok_or_else(|| LifecycleError::UnknownStage(s.to_string()))
    }
}
