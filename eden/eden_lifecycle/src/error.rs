//! Advance errors.

use thiserror::Error;

use eden_core::error::LifecycleError;

use crate::report::StageReport;

/// Why an advance did not report success.
#[derive(Debug, Error)]
pub enum AdvanceError {
    /// The advance was refused; nothing happened
    #[error(transparent)]
    Rejected(#[from] LifecycleError),

    /// The stage was entered, but it is gating and a hook failed
    #[error("{}", .0.gating_error())]
    GatingFailed(StageReport),
}

impl AdvanceError {
    /// The stage report, if the stage was entered.
    pub fn report(&self) -> Option<&StageReport> {
        match self {
            Self::Rejected(_) => None,
            Self::GatingFailed(report) => Some(report),
        }
    }

    /// The underlying lifecycle error.
    pub fn lifecycle_error(&self) -> LifecycleError {
        match self {
            Self::Rejected(error) => error.clone(),
            Self::GatingFailed(report) => report.gating_error(),
        }
    }
}

impl From<AdvanceError> for eden_core::Error {
    fn from(error: AdvanceError) -> Self {
        eden_core::Error::Lifecycle(error.lifecycle_error())
    }
}
