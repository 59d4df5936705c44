use async_trait::async_trait;
use std::sync::Arc;

use eden_core::error::{LifecycleError, PluginError};
use eden_core::types::{HookSource, LifecycleStage};
use eden_lifecycle::{
    AdvanceError, DispatcherConfig, HookExecutor, HookInvocation, HookStatus, LifecycleDispatcher,
};

/// Records every invocation it receives.
#[derive(Default)]
struct RecordingExecutor {
    seen: parking_lot::Mutex<Vec<(LifecycleStage, String)>>,
}

#[async_trait]
impl HookExecutor for RecordingExecutor {
    async fn execute(&self, invocation: HookInvocation) -> Result<(), PluginError> {
        self.seen
            .lock()
            .push((invocation.stage, invocation.source.to_string()));
        Ok(())
    }
}

fn new_dispatcher() -> (LifecycleDispatcher, Arc<RecordingExecutor>) {
    let executor = Arc::new(RecordingExecutor::default());
    let dispatcher = LifecycleDispatcher::new(
        DispatcherConfig::default(),
        Arc::clone(&executor) as Arc<dyn HookExecutor>,
    );
    (dispatcher, executor)
}

async fn advance_to(dispatcher: &LifecycleDispatcher, target: LifecycleStage) {
    for stage in LifecycleStage::ALL {
        if stage > target {
            break;
        }
        dispatcher.advance(stage).await.unwrap();
    }
}

#[tokio::test]
async fn test_user_config_loaded_scenario() {
    let (dispatcher, executor) = new_dispatcher();
    let url1 = HookSource::parse("file:///plugins/one/hook.js").unwrap();
    let url2 = HookSource::parse("file:///plugins/two/hook.js").unwrap();

    assert!(dispatcher.register(LifecycleStage::UserConfigLoaded, url1.clone()));
    assert!(dispatcher.register(LifecycleStage::UserConfigLoaded, url2.clone()));

    advance_to(&dispatcher, LifecycleStage::UserConfigLoaded).await;
    assert_eq!(dispatcher.state(), Some(LifecycleStage::UserConfigLoaded));

    assert_eq!(
        dispatcher.list(LifecycleStage::UserConfigLoaded),
        vec![url1.clone(), url2.clone()]
    );
    assert!(dispatcher.unregister(LifecycleStage::UserConfigLoaded, &url1));
    assert_eq!(
        dispatcher.list(LifecycleStage::UserConfigLoaded),
        vec![url2.clone()]
    );

    let seen = executor.seen.lock().clone();
    assert_eq!(
        seen,
        vec![
            (LifecycleStage::UserConfigLoaded, url1.to_string()),
            (LifecycleStage::UserConfigLoaded, url2.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_duplicate_registration_is_noop() {
    let (dispatcher, _) = new_dispatcher();
    let hook = HookSource::parse("/plugins/a.js").unwrap();
    let same = HookSource::parse("file:///plugins/./a.js").unwrap();

    assert!(dispatcher.register(LifecycleStage::OsInit, hook));
    assert!(!dispatcher.register(LifecycleStage::OsInit, same));
    assert_eq!(dispatcher.list(LifecycleStage::OsInit).len(), 1);
}

#[tokio::test]
async fn test_skip_and_repeat_leave_state_unchanged() {
    let (dispatcher, _) = new_dispatcher();
    advance_to(&dispatcher, LifecycleStage::OsInit).await;

    for bad in [
        LifecycleStage::OsInit,
        LifecycleStage::OsStartup,
        LifecycleStage::OsLoadShell,
        LifecycleStage::OsBootFinished,
    ] {
        let error = dispatcher.advance(bad).await.unwrap_err();
        assert!(matches!(
            error,
            AdvanceError::Rejected(LifecycleError::OrderViolation {
                current: Some(LifecycleStage::OsInit),
                ..
            })
        ));
        assert_eq!(dispatcher.state(), Some(LifecycleStage::OsInit));
    }
}

#[tokio::test]
async fn test_full_boot_and_beyond() {
    let (dispatcher, _) = new_dispatcher();
    advance_to(&dispatcher, LifecycleStage::OsBootFinished).await;
    assert_eq!(dispatcher.next_stage(), None);
    assert!(dispatcher.advance(LifecycleStage::OsBootFinished).await.is_err());
}

#[tokio::test]
async fn test_extension_handle_sees_dispatcher_state() {
    let (dispatcher, _) = new_dispatcher();
    let handle = dispatcher.handle();
    let hook = HookSource::parse("/plugins/late.js").unwrap();

    assert!(handle.register(LifecycleStage::UserLoading, hook.clone()));
    assert_eq!(dispatcher.list(LifecycleStage::UserLoading), vec![hook]);

    dispatcher.advance(LifecycleStage::OsStartup).await.unwrap();
    assert_eq!(handle.state(), Some(LifecycleStage::OsStartup));
}

#[tokio::test]
async fn test_concurrent_advances_are_serialized() {
    let (dispatcher, _) = new_dispatcher();
    let dispatcher = Arc::new(dispatcher);

    let attempts = (0..8).map(|_| {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move { dispatcher.advance(LifecycleStage::OsStartup).await })
    });
    let results = futures::future::join_all(attempts).await;

    let succeeded = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(report)) if report.outcomes.iter().all(|o| o.status == HookStatus::Succeeded)))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(dispatcher.state(), Some(LifecycleStage::OsStartup));
}
