//! The lifecycle dispatcher.
//!
//! The dispatcher owns the hook table and the current-stage marker. Only
//! the host advances it, one immediate successor at a time; extensions get
//! a [`LifecycleHandle`] that can register, unregister and inspect but not
//! advance.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use eden_core::error::{LifecycleError, PluginError};
use eden_core::types::{HookSource, LifecycleStage};

use crate::config::DispatcherConfig;
use crate::error::AdvanceError;
use crate::executor::{HookExecutor, HookInvocation};
use crate::report::{HookOutcome, HookStatus, StageReport};
use crate::table::HookTable;

struct LifecycleState {
    table: HookTable,
    current: RwLock<Option<LifecycleStage>>,
}

/// Registration and inspection surface shared with extensions.
#[derive(Clone)]
pub struct LifecycleHandle {
    state: Arc<LifecycleState>,
}

impl LifecycleHandle {
    /// Register `source` for `stage`; false if already registered.
    pub fn register(&self, stage: LifecycleStage, source: HookSource) -> bool {
        let added = self.state.table.register(stage, source.clone());
        if added {
            debug!(%stage, %source, "Hook registered");
        }
        added
    }

    /// Remove `source` from `stage`; false if it was not registered.
    pub fn unregister(&self, stage: LifecycleStage, source: &HookSource) -> bool {
        let removed = self.state.table.unregister(stage, source);
        if removed {
            debug!(%stage, %source, "Hook unregistered");
        }
        removed
    }

    /// Hooks of `stage` in registration order.
    pub fn list(&self, stage: LifecycleStage) -> Vec<HookSource> {
        self.state.table.list(stage)
    }

    /// The most recently entered stage, `None` before the first advance.
    pub fn state(&self) -> Option<LifecycleStage> {
        *self.state.current.read()
    }
}

/// Ordered boot-sequence event bus.
pub struct LifecycleDispatcher {
    handle: LifecycleHandle,
    config: DispatcherConfig,
    executor: Arc<dyn HookExecutor>,
    advance_lock: Mutex<()>,
}

impl LifecycleDispatcher {
    /// Create a dispatcher that runs hooks through `executor`.
    pub fn new(config: DispatcherConfig, executor: Arc<dyn HookExecutor>) -> Self {
        Self {
            handle: LifecycleHandle {
                state: Arc::new(LifecycleState {
                    table: HookTable::new(),
                    current: RwLock::new(None),
                }),
            },
            config,
            executor,
            advance_lock: Mutex::new(()),
        }
    }

    /// Handle for registration without the ability to advance.
    pub fn handle(&self) -> LifecycleHandle {
        self.handle.clone()
    }

    /// Dispatcher settings.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// See [`LifecycleHandle::register`].
    pub fn register(&self, stage: LifecycleStage, source: HookSource) -> bool {
        self.handle.register(stage, source)
    }

    /// See [`LifecycleHandle::unregister`].
    pub fn unregister(&self, stage: LifecycleStage, source: &HookSource) -> bool {
        self.handle.unregister(stage, source)
    }

    /// See [`LifecycleHandle::list`].
    pub fn list(&self, stage: LifecycleStage) -> Vec<HookSource> {
        self.handle.list(stage)
    }

    /// See [`LifecycleHandle::state`].
    pub fn state(&self) -> Option<LifecycleStage> {
        self.handle.state()
    }

    /// The stage `advance` will accept next, `None` once booted.
    pub fn next_stage(&self) -> Option<LifecycleStage> {
        match self.state() {
            None => Some(LifecycleStage::first()),
            Some(current) => current.successor(),
        }
    }

    /// Enter `stage` and run its hooks.
    ///
    /// `stage` must be the immediate successor of the current stage (or
    /// `os-startup` before the first advance); anything else is rejected
    /// without effect. The stage marker moves before hooks run and stays
    /// put whatever the hooks do. Hooks registered after this point are not
    /// run for `stage`.
    pub async fn advance(&self, stage: LifecycleStage) -> Result<StageReport, AdvanceError> {
        let _serialized = self.advance_lock.lock().await;

        let hooks = {
            let mut current = self.handle.state.current.write();
            let expected = match *current {
                None => Some(LifecycleStage::first()),
                Some(entered) => entered.successor(),
            };
            if expected != Some(stage) {
                warn!(current = ?*current, requested = %stage, "Rejected out-of-order advance");
                return Err(LifecycleError::OrderViolation {
                    current: *current,
                    requested: stage,
                }
                .into());
            }
            *current = Some(stage);
            self.handle.state.table.list(stage)
        };

        info!(%stage, hooks = hooks.len(), "Entering lifecycle stage");

        let started_at = chrono::Utc::now();
        let started = Instant::now();
        let timeout = self.config.hook_timeout();
        let limit = self.config.max_concurrent_hooks.max(1);

        let outcomes: Vec<HookOutcome> = stream::iter(hooks)
            .map(|source| self.run_hook(stage, source, timeout))
            .buffered(limit)
            .collect()
            .await;

        let report = StageReport {
            stage,
            outcomes,
            started_at,
            elapsed: started.elapsed(),
        };

        if report.is_success() {
            info!(%stage, elapsed_ms = report.elapsed.as_millis() as u64, "Lifecycle stage completed");
            Ok(report)
        } else if self.config.is_gating(stage) {
            warn!(%stage, failed = report.failure_count(), "Gating lifecycle stage failed");
            Err(AdvanceError::GatingFailed(report))
        } else {
            warn!(%stage, failed = report.failure_count(), "Lifecycle stage completed with failed hooks");
            Ok(report)
        }
    }

    async fn run_hook(
        &self,
        stage: LifecycleStage,
        source: HookSource,
        timeout: Duration,
    ) -> HookOutcome {
        let invocation = HookInvocation::new(stage, source.clone());
        let id = invocation.id;
        let started = Instant::now();

        debug!(%stage, %source, invocation = %id, "Running hook");
        let run = AssertUnwindSafe(self.executor.execute(invocation)).catch_unwind();

        let (status, error) = match tokio::time::timeout(timeout, run).await {
            Ok(Ok(Ok(()))) => (HookStatus::Succeeded, None),
            Ok(Ok(Err(error))) => (HookStatus::Failed, Some(error)),
            Ok(Err(panic)) => (
                HookStatus::Panicked,
                Some(PluginError::HookExecution {
                    stage,
                    locator: source.to_string(),
                    message: format!("hook panicked: {}", panic_message(panic.as_ref())),
                }),
            ),
            Err(_) => (
                HookStatus::TimedOut,
                Some(PluginError::HookTimeout {
                    stage,
                    locator: source.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            ),
        };

        if let Some(error) = &error {
            warn!(%stage, %source, %status, %error, "Hook did not succeed");
        }

        HookOutcome {
            invocation: id,
            source,
            status,
            error,
            elapsed: started.elapsed(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Hang,
    }

    /// Executes hooks according to a per-source script and records the order
    /// in which they started.
    #[derive(Default)]
    struct ScriptedExecutor {
        behaviors: HashMap<String, Behavior>,
        started: parking_lot::Mutex<Vec<String>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedExecutor {
        fn with(mut self, path: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(path.to_string(), behavior);
            self
        }
    }

    #[async_trait]
    impl HookExecutor for ScriptedExecutor {
        async fn execute(&self, invocation: HookInvocation) -> Result<(), PluginError> {
            let path = invocation.source.to_string();
            self.started.lock().push(path.clone());
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(10)).await;
            let behavior = self.behaviors.get(&path).copied().unwrap_or(Behavior::Succeed);
            self.running.fetch_sub(1, Ordering::SeqCst);

            match behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => Err(PluginError::HandlerFailed(format!("{} failed", path))),
                Behavior::Panic => panic!("boom in {}", path),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }

    fn source(path: &str) -> HookSource {
        HookSource::parse(path).unwrap()
    }

    fn dispatcher(config: DispatcherConfig, executor: ScriptedExecutor) -> (LifecycleDispatcher, Arc<ScriptedExecutor>) {
        let executor = Arc::new(executor);
        let dispatcher = LifecycleDispatcher::new(config, Arc::clone(&executor) as Arc<dyn HookExecutor>);
        (dispatcher, executor)
    }

    #[tokio::test]
    async fn test_advance_requires_immediate_successor() {
        let (dispatcher, _) = dispatcher(DispatcherConfig::default(), ScriptedExecutor::default());
        assert_eq!(dispatcher.state(), None);

        let skipped = dispatcher.advance(LifecycleStage::OsInit).await;
        assert!(matches!(
            skipped,
            Err(AdvanceError::Rejected(LifecycleError::OrderViolation { current: None, .. }))
        ));
        assert_eq!(dispatcher.state(), None);

        dispatcher.advance(LifecycleStage::OsStartup).await.unwrap();
        let repeated = dispatcher.advance(LifecycleStage::OsStartup).await;
        assert!(repeated.is_err());
        assert_eq!(dispatcher.state(), Some(LifecycleStage::OsStartup));

        dispatcher
            .advance(LifecycleStage::UserDrivesSorted)
            .await
            .unwrap();
        assert_eq!(dispatcher.next_stage(), Some(LifecycleStage::UserDrivesFound));
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let config = DispatcherConfig {
            max_concurrent_hooks: 1,
            ..Default::default()
        };
        let (dispatcher, executor) = dispatcher(config, ScriptedExecutor::default());
        for path in ["/c.js", "/a.js", "/b.js"] {
            dispatcher.register(LifecycleStage::OsStartup, source(path));
        }

        let report = dispatcher.advance(LifecycleStage::OsStartup).await.unwrap();
        let order: Vec<String> = report.outcomes.iter().map(|o| o.source.to_string()).collect();
        assert_eq!(order, vec!["/c.js", "/a.js", "/b.js"]);
        assert_eq!(*executor.started.lock(), order);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let config = DispatcherConfig {
            max_concurrent_hooks: 2,
            ..Default::default()
        };
        let (dispatcher, executor) = dispatcher(config, ScriptedExecutor::default());
        for i in 0..6 {
            dispatcher.register(LifecycleStage::OsStartup, source(&format!("/h{}.js", i)));
        }

        let report = dispatcher.advance(LifecycleStage::OsStartup).await.unwrap();
        assert_eq!(report.outcomes.len(), 6);
        assert_eq!(executor.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let executor = ScriptedExecutor::default()
            .with("/fail.js", Behavior::Fail)
            .with("/panic.js", Behavior::Panic);
        let (dispatcher, _) = dispatcher(DispatcherConfig::default(), executor);
        for path in ["/fail.js", "/ok.js", "/panic.js", "/ok2.js"] {
            dispatcher.register(LifecycleStage::OsStartup, source(path));
        }

        let report = dispatcher.advance(LifecycleStage::OsStartup).await.unwrap();
        let statuses: Vec<HookStatus> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                HookStatus::Failed,
                HookStatus::Succeeded,
                HookStatus::Panicked,
                HookStatus::Succeeded
            ]
        );
        assert_eq!(report.failure_count(), 2);
        assert_eq!(dispatcher.state(), Some(LifecycleStage::OsStartup));
    }

    #[tokio::test]
    async fn test_timed_out_hooks_are_reported() {
        let config = DispatcherConfig {
            hook_timeout_ms: 50,
            ..Default::default()
        };
        let executor = ScriptedExecutor::default().with("/hang.js", Behavior::Hang);
        let (dispatcher, _) = dispatcher(config, executor);
        dispatcher.register(LifecycleStage::OsStartup, source("/hang.js"));
        dispatcher.register(LifecycleStage::OsStartup, source("/ok.js"));

        let report = dispatcher.advance(LifecycleStage::OsStartup).await.unwrap();
        assert_eq!(report.outcomes[0].status, HookStatus::TimedOut);
        assert!(matches!(
            report.outcomes[0].error,
            Some(PluginError::HookTimeout { timeout_ms: 50, .. })
        ));
        assert_eq!(report.outcomes[1].status, HookStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_gating_stage_fails_but_marker_stays() {
        let config = DispatcherConfig {
            gating_stages: vec![LifecycleStage::OsStartup],
            ..Default::default()
        };
        let executor = ScriptedExecutor::default().with("/fail.js", Behavior::Fail);
        let (dispatcher, _) = dispatcher(config, executor);
        dispatcher.register(LifecycleStage::OsStartup, source("/fail.js"));
        dispatcher.register(LifecycleStage::OsStartup, source("/ok.js"));

        let error = dispatcher.advance(LifecycleStage::OsStartup).await.unwrap_err();
        let report = error.report().unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(
            error.lifecycle_error(),
            LifecycleError::GatingFailed {
                stage: LifecycleStage::OsStartup,
                failed: 1,
                total: 2
            }
        );
        assert_eq!(dispatcher.state(), Some(LifecycleStage::OsStartup));
    }

    #[tokio::test]
    async fn test_late_registration_not_invoked() {
        let (dispatcher, executor) = dispatcher(DispatcherConfig::default(), ScriptedExecutor::default());
        dispatcher.advance(LifecycleStage::OsStartup).await.unwrap();

        assert!(dispatcher.register(LifecycleStage::OsStartup, source("/late.js")));
        assert_eq!(dispatcher.list(LifecycleStage::OsStartup).len(), 1);
        assert!(executor.started.lock().is_empty());
    }
}
