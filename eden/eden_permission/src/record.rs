//! Per-descriptor permission records.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

use eden_core::id::SubscriptionId;
use eden_core::types::{PermissionDescriptor, PermissionState};

use crate::subscription::{PermissionChange, PermissionStatus};

/// Shared handle to a record; the mutex serializes transitions and
/// notification so subscribers see changes in transition order.
pub(crate) type SharedRecord = Arc<Mutex<PermissionRecord>>;

struct Subscriber {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<PermissionChange>,
}

/// State and subscribers of one normalized descriptor.
pub(crate) struct PermissionRecord {
    descriptor: PermissionDescriptor,
    state: PermissionState,
    version: u64,
    subscribers: Vec<Subscriber>,
}

impl PermissionRecord {
    pub(crate) fn new(descriptor: PermissionDescriptor) -> Self {
        Self {
            descriptor,
            state: PermissionState::Prompt,
            version: 0,
            subscribers: Vec::new(),
        }
    }

    pub(crate) fn shared(descriptor: PermissionDescriptor) -> SharedRecord {
        Arc::new(Mutex::new(Self::new(descriptor)))
    }

    pub(crate) fn state(&self) -> PermissionState {
        self.state
    }

    /// Number of transitions applied so far.
    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    /// Move to `state`, notifying subscribers if it differs from the
    /// current one.
    pub(crate) fn transition(&mut self, state: PermissionState) -> Option<PermissionChange> {
        if self.state == state {
            return None;
        }

        let change = PermissionChange::new(self.descriptor.clone(), self.state, state);
        self.state = state;
        self.version += 1;

        // Closed receivers are pruned here
        self.subscribers
            .retain(|subscriber| subscriber.sender.send(change.clone()).is_ok());

        Some(change)
    }

    /// Overwrite the state without notifying anyone.
    pub(crate) fn seed(&mut self, state: PermissionState) {
        self.state = state;
    }

    /// Attach a subscriber. `observed` is the state reported to it.
    pub(crate) fn subscribe(&mut self, observed: PermissionState) -> PermissionStatus {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = SubscriptionId::new();
        self.subscribers.push(Subscriber { id, sender });
        PermissionStatus::new(id, self.descriptor.clone(), observed, receiver)
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| subscriber.id != id);
        self.subscribers.len() != before
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|subscriber| !subscriber.sender.is_closed())
            .count()
    }
}
