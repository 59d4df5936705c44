//! Results of entering a stage.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use eden_core::error::{LifecycleError, PluginError};
use eden_core::id::InvocationId;
use eden_core::types::{HookSource, LifecycleStage};

/// How a single hook invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStatus {
    /// The hook completed successfully
    Succeeded,
    /// The hook returned an error
    Failed,
    /// The hook did not settle within the timeout
    TimedOut,
    /// The hook panicked
    Panicked,
}

impl HookStatus {
    /// Whether this counts as success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for HookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
            Self::Panicked => "panicked",
        };
        f.write_str(text)
    }
}

/// Outcome of one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    /// Invocation identifier
    pub invocation: InvocationId,

    /// The hook that ran
    pub source: HookSource,

    /// How it ended
    pub status: HookStatus,

    /// Failure details for anything but success
    pub error: Option<PluginError>,

    /// Time from start to settlement
    pub elapsed: Duration,
}

/// Outcomes of all hooks that ran for a stage, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// The stage that was entered
    pub stage: LifecycleStage,

    /// One outcome per hook snapshotted at advance time
    pub outcomes: Vec<HookOutcome>,

    /// When the stage was entered
    pub started_at: DateTime<Utc>,

    /// Time until every hook settled
    pub elapsed: Duration,
}

impl StageReport {
    /// Outcomes that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &HookOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_success())
    }

    /// Number of outcomes that did not succeed.
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// True when every hook succeeded (vacuously true with no hooks).
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_success())
    }

    /// The error a gating stage with this report fails with.
    pub fn gating_error(&self) -> LifecycleError {
        LifecycleError::GatingFailed {
            stage: self.stage,
            failed: self.failure_count(),
            total: self.outcomes.len(),
        }
    }
}
