//! The permission registry.
//!
//! Records are keyed by normalized descriptor. A record's state changes only
//! through a completed resolution (`request`) or through `revoke`; `query`
//! never creates or changes anything.
//!
//! Concurrent requests for the same unresolved descriptor share a single
//! resolution: the first caller spawns it and stores a [`Shared`] handle in
//! the in-flight table, later callers clone that handle. The resolution
//! settles the record before it removes its in-flight entry, so any caller
//! that misses the entry sees the decided state instead.
//!
//! Saves to the decision store are serialized per descriptor and always
//! write the record's latest state, so the store never ends up behind a
//! transition that happened in memory.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use eden_core::error::PermissionError;
use eden_core::types::{PermissionDescriptor, PermissionState};

use crate::prompt::PermissionPrompter;
use crate::record::{PermissionRecord, SharedRecord};
use crate::store::{DecisionStore, InMemoryDecisionStore};
use crate::subscription::PermissionStatus;

type Resolution = Shared<BoxFuture<'static, Result<PermissionState, PermissionError>>>;

/// Builder for [`PermissionRegistry`].
#[derive(Default)]
pub struct PermissionRegistryBuilder {
    prompter: Option<Arc<dyn PermissionPrompter>>,
    store: Option<Arc<dyn DecisionStore>>,
}

impl PermissionRegistryBuilder {
    /// Use `prompter` to resolve prompts.
    pub fn prompter(mut self, prompter: impl PermissionPrompter + 'static) -> Self {
        self.prompter = Some(Arc::new(prompter));
        self
    }

    /// Use an already shared prompter.
    pub fn shared_prompter(mut self, prompter: Arc<dyn PermissionPrompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Persist decisions to `store` instead of memory.
    pub fn store(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the registry. Persisted decisions are not loaded until
    /// [`PermissionRegistry::load_decisions`] is called.
    pub fn build(self) -> PermissionRegistry {
        PermissionRegistry {
            inner: Arc::new(RegistryInner {
                records: DashMap::new(),
                in_flight: DashMap::new(),
                persisted: DashMap::new(),
                prompter: self.prompter,
                store: self
                    .store
                    .unwrap_or_else(|| Arc::new(InMemoryDecisionStore::new())),
                resolutions: AtomicU64::new(0),
            }),
        }
    }
}

/// Capability-based permission engine.
///
/// Cheap to clone; clones share the same records.
#[derive(Clone)]
pub struct PermissionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    records: DashMap<PermissionDescriptor, SharedRecord>,
    in_flight: DashMap<PermissionDescriptor, Resolution>,
    /// Record version last written to the store, per descriptor
    persisted: DashMap<PermissionDescriptor, Arc<AsyncMutex<u64>>>,
    prompter: Option<Arc<dyn PermissionPrompter>>,
    store: Arc<dyn DecisionStore>,
    resolutions: AtomicU64,
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PermissionRegistry {
    /// Registry without a prompter, backed by memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start configuring a registry.
    pub fn builder() -> PermissionRegistryBuilder {
        PermissionRegistryBuilder::default()
    }

    /// Current effective state of `descriptor`.
    ///
    /// The record's own decision wins; otherwise the nearest broader
    /// descriptor with a decision; otherwise `prompt`. Never prompts and
    /// never creates a record.
    pub fn query(&self, descriptor: &PermissionDescriptor) -> PermissionState {
        self.inner.effective_state(&descriptor.normalize())
    }

    /// Resolve `descriptor` into a decision, prompting if necessary.
    pub async fn request(
        &self,
        descriptor: &PermissionDescriptor,
    ) -> Result<PermissionState, PermissionError> {
        let key = descriptor.normalize();
        let state = self.inner.effective_state(&key);
        if state.is_decided() {
            return Ok(state);
        }

        self.resolution_for(key).await
    }

    /// Like [`request`](Self::request), but turns a denial into
    /// `PermissionError::Denied`.
    pub async fn require(&self, descriptor: &PermissionDescriptor) -> Result<(), PermissionError> {
        match self.request(descriptor).await? {
            PermissionState::Granted => Ok(()),
            PermissionState::Denied => Err(PermissionError::Denied(descriptor.normalize())),
            PermissionState::Prompt => Err(PermissionError::ResolutionUnavailable {
                descriptor: descriptor.normalize(),
                reason: "resolution finished without a decision".to_string(),
            }),
        }
    }

    /// Set `descriptor` to `denied`.
    ///
    /// Subscribers are notified only if the state actually changed. Granted
    /// records of narrower descriptors (for example `read(/etc/passwd)` when
    /// revoking `read`) are revoked as well.
    pub async fn revoke(&self, descriptor: &PermissionDescriptor) -> PermissionState {
        let key = descriptor.normalize();

        let record = self.inner.record(&key);
        let change = record.lock().transition(PermissionState::Denied);
        if let Some(change) = change {
            info!(descriptor = %key, previous = %change.previous, "Permission revoked");
            self.inner.persist(&key).await;
        }

        for (narrower, record) in self.inner.narrower_records(&key) {
            let change = {
                let mut record = record.lock();
                if record.state() == PermissionState::Granted {
                    record.transition(PermissionState::Denied)
                } else {
                    None
                }
            };
            if change.is_some() {
                info!(descriptor = %narrower, broader = %key, "Permission revoked with broader descriptor");
                self.inner.persist(&narrower).await;
            }
        }

        PermissionState::Denied
    }

    /// Watch `descriptor` for state changes.
    pub fn subscribe(&self, descriptor: &PermissionDescriptor) -> PermissionStatus {
        let key = descriptor.normalize();
        let record = self.inner.record(&key);
        let mut record = record.lock();
        let observed = if record.state().is_decided() {
            record.state()
        } else {
            self.inner.broader_state(&key)
        };
        record.subscribe(observed)
    }

    /// Stop delivering changes to `status`.
    pub fn unsubscribe(&self, status: &PermissionStatus) -> bool {
        self.inner
            .records
            .get(status.descriptor())
            .map(|record| Arc::clone(record.value()))
            .is_some_and(|record| record.lock().unsubscribe(status.id()))
    }

    /// Seed a decision without prompting or notifying.
    ///
    /// Used by the host at startup for configured and persisted decisions.
    pub fn restore(&self, descriptor: &PermissionDescriptor, state: PermissionState) {
        let key = descriptor.normalize();
        debug!(descriptor = %key, %state, "Restoring permission decision");
        self.inner.record(&key).lock().seed(state);
    }

    /// Restore every decision held by the configured store.
    pub async fn load_decisions(&self) -> Result<usize, PermissionError> {
        let decisions = self.inner.store.load().await?;
        for decision in &decisions {
            self.restore(&decision.descriptor, decision.state);
        }
        info!(count = decisions.len(), "Loaded persisted permission decisions");
        Ok(decisions.len())
    }

    /// All decided records, sorted by descriptor.
    pub fn snapshot(&self) -> Vec<(PermissionDescriptor, PermissionState)> {
        let records: Vec<(PermissionDescriptor, SharedRecord)> = self
            .inner
            .records
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut decided: Vec<_> = records
            .into_iter()
            .map(|(descriptor, record)| (descriptor, record.lock().state()))
            .filter(|(_, state)| state.is_decided())
            .collect();
        decided.sort_by(|a, b| a.0.cmp(&b.0));
        decided
    }

    /// Number of resolutions started since the registry was built.
    pub fn resolutions_started(&self) -> u64 {
        self.inner.resolutions.load(Ordering::Relaxed)
    }

    /// Number of resolutions currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    fn resolution_for(&self, key: PermissionDescriptor) -> Resolution {
        match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!(descriptor = %key, "Joining in-flight resolution");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // A resolution may have settled after the caller's first look
                let state = self.inner.effective_state(&key);
                if state.is_decided() {
                    return future::ready(Ok(state)).boxed().shared();
                }

                let inner = Arc::clone(&self.inner);
                let task_key = key.clone();
                let handle = tokio::spawn(async move { inner.resolve(task_key).await });

                let resolution = async move {
                    handle.await.unwrap_or_else(|e| {
                        Err(PermissionError::ResolutionUnavailable {
                            descriptor: key,
                            reason: format!("resolution task failed: {}", e),
                        })
                    })
                }
                .boxed()
                .shared();

                entry.insert(resolution.clone());
                resolution
            }
        }
    }
}

impl RegistryInner {
    fn record(&self, key: &PermissionDescriptor) -> SharedRecord {
        let entry = self
            .records
            .entry(key.clone())
            .or_insert_with(|| PermissionRecord::shared(key.clone()));
        Arc::clone(entry.value())
    }

    fn explicit_state(&self, key: &PermissionDescriptor) -> Option<PermissionState> {
        let record = self.records.get(key).map(|r| Arc::clone(r.value()))?;
        let state = record.lock().state();
        state.is_decided().then_some(state)
    }

    fn broader_state(&self, key: &PermissionDescriptor) -> PermissionState {
        key.broader()
            .iter()
            .find_map(|broader| self.explicit_state(broader))
            .unwrap_or(PermissionState::Prompt)
    }

    fn effective_state(&self, key: &PermissionDescriptor) -> PermissionState {
        self.explicit_state(key)
            .unwrap_or_else(|| self.broader_state(key))
    }

    fn narrower_records(&self, key: &PermissionDescriptor) -> Vec<(PermissionDescriptor, SharedRecord)> {
        self.records
            .iter()
            .filter(|entry| entry.key().broader().contains(key))
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Write the record's current state to the store.
    ///
    /// Called after every transition. A caller whose transition was already
    /// covered by a later save skips the write.
    async fn persist(&self, key: &PermissionDescriptor) {
        let gate = Arc::clone(
            self.persisted
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(0)))
                .value(),
        );
        let mut written = gate.lock().await;

        let (state, version) = {
            let record = self.record(key);
            let record = record.lock();
            (record.state(), record.version())
        };
        if version <= *written {
            debug!(descriptor = %key, version, "Decision already persisted");
            return;
        }

        match self.store.save(key, state).await {
            Ok(()) => *written = version,
            Err(error) => {
                warn!(descriptor = %key, %error, "Failed to persist permission decision")
            }
        }
    }

    async fn resolve(self: Arc<Self>, key: PermissionDescriptor) -> Result<PermissionState, PermissionError> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        debug!(descriptor = %key, "Starting permission resolution");

        // Cleared on every exit, unwinding included, so a later request can
        // start a fresh resolution
        let _slot = InFlightSlot {
            in_flight: &self.in_flight,
            key: &key,
        };

        let outcome = match &self.prompter {
            Some(prompter) => AssertUnwindSafe(prompter.prompt(&key))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(unavailable(&key, "prompter panicked"))),
            None => Err(unavailable(&key, "no prompter configured")),
        };

        match outcome {
            Ok(decision) => {
                let decided = PermissionState::from(decision);
                let record = self.record(&key);
                let applied = {
                    let mut record = record.lock();
                    // A revoke that landed while the prompt was open wins
                    if record.state() == PermissionState::Prompt {
                        record.transition(decided);
                        None
                    } else {
                        Some(record.state())
                    }
                };

                match applied {
                    None => {
                        info!(descriptor = %key, state = %decided, "Permission resolved");
                        self.persist(&key).await;
                        Ok(decided)
                    }
                    Some(current) => {
                        debug!(descriptor = %key, %current, "Record decided during prompt");
                        Ok(current)
                    }
                }
            }
            Err(PermissionError::ResolutionUnavailable { descriptor, reason }) => {
                warn!(%descriptor, %reason, "Permission resolution unavailable");
                Err(PermissionError::ResolutionUnavailable { descriptor, reason })
            }
            Err(other) => {
                warn!(descriptor = %key, error = %other, "Prompter failed");
                Err(unavailable(&key, &other.to_string()))
            }
        }
    }
}

/// Removes a descriptor's in-flight entry when dropped.
struct InFlightSlot<'a> {
    in_flight: &'a DashMap<PermissionDescriptor, Resolution>,
    key: &'a PermissionDescriptor,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(self.key);
    }
}

fn unavailable(descriptor: &PermissionDescriptor, reason: &str) -> PermissionError {
    PermissionError::ResolutionUnavailable {
        descriptor: descriptor.clone(),
        reason: reason.to_string(),
    }
}
