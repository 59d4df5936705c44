//! Boot sequence outcome.

use thiserror::Error;

use eden_core::error::LifecycleError;
use eden_lifecycle::StageReport;

/// Why a boot stopped before `os-boot-finished`.
#[derive(Debug, Error)]
pub enum BootError {
    /// A gating stage was entered but some of its hooks failed
    #[error("Boot halted: gating stage {} had {} failed hook(s)", .report.stage, .report.failure_count())]
    GatingFailed {
        /// Reports of the stages entered before the failing one
        completed: Vec<StageReport>,

        /// Report of the failing stage
        report: StageReport,
    },

    /// The dispatcher refused to advance
    #[error("Boot rejected: {error}")]
    Rejected {
        /// Reports of the stages entered before the refusal
        completed: Vec<StageReport>,

        /// Why the advance was refused
        error: LifecycleError,
    },
}

impl BootError {
    /// Reports of every stage that was entered, the failing one included.
    pub fn reports(&self) -> Vec<&StageReport> {
        match self {
            Self::GatingFailed { completed, report } => {
                completed.iter().chain(std::iter::once(report)).collect()
            }
            Self::Rejected { completed, .. } => completed.iter().collect(),
        }
    }
}
