//! # Eden Lifecycle
//!
//! Staged lifecycle dispatcher for the Eden extension host.
//!
//! Host startup is a fixed sequence of twelve [`LifecycleStage`]s. Extensions
//! register hooks for stages; when the host advances into a stage, the
//! hooks registered for it at that moment are handed to a [`HookExecutor`]
//! in registration order, with bounded concurrency and a per-hook timeout.
//! Each hook's outcome is captured in a [`StageReport`]; a failing hook never
//! stops its siblings.
//!
//! [`LifecycleStage`]: eden_core::types::LifecycleStage

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod report;
pub mod table;

pub use config::DispatcherConfig;
pub use dispatcher::{LifecycleDispatcher, LifecycleHandle};
pub use error::AdvanceError;
pub use executor::{HookExecutor, HookInvocation};
pub use report::{HookOutcome, HookStatus, StageReport};
pub use table::HookTable;
