//! Change notification for permission records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use eden_core::id::SubscriptionId;
use eden_core::types::{PermissionDescriptor, PermissionState};

/// A single state transition of a permission record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionChange {
    /// Normalized descriptor of the record that changed
    pub descriptor: PermissionDescriptor,

    /// State before the transition
    pub previous: PermissionState,

    /// State after the transition
    pub current: PermissionState,

    /// When the transition happened
    pub at: DateTime<Utc>,
}

impl PermissionChange {
    pub(crate) fn new(
        descriptor: PermissionDescriptor,
        previous: PermissionState,
        current: PermissionState,
    ) -> Self {
        Self {
            descriptor,
            previous,
            current,
            at: Utc::now(),
        }
    }
}

/// Handle returned by `subscribe`.
///
/// Carries the state observed at subscription time and receives every later
/// transition of the same record, in transition order. Dropping the handle
/// ends the subscription.
#[derive(Debug)]
pub struct PermissionStatus {
    id: SubscriptionId,
    descriptor: PermissionDescriptor,
    state: PermissionState,
    receiver: mpsc::UnboundedReceiver<PermissionChange>,
}

impl PermissionStatus {
    pub(crate) fn new(
        id: SubscriptionId,
        descriptor: PermissionDescriptor,
        state: PermissionState,
        receiver: mpsc::UnboundedReceiver<PermissionChange>,
    ) -> Self {
        Self {
            id,
            descriptor,
            state,
            receiver,
        }
    }

    /// Subscription identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Normalized descriptor this handle watches.
    pub fn descriptor(&self) -> &PermissionDescriptor {
        &self.descriptor
    }

    /// Latest state known to this handle.
    ///
    /// Starts as the state at subscription time and follows every change
    /// consumed through [`changed`](Self::changed) or
    /// [`try_changed`](Self::try_changed).
    pub fn state(&self) -> PermissionState {
        self.state
    }

    /// Wait for the next transition.
    ///
    /// Returns `None` once the registry has been dropped.
    pub async fn changed(&mut self) -> Option<PermissionChange> {
        let change = self.receiver.recv().await?;
        self.state = change.current;
        Some(change)
    }

    /// Take the next transition if one is already queued.
    pub fn try_changed(&mut self) -> Option<PermissionChange> {
        let change = self.receiver.try_recv().ok()?;
        self.state = change.current;
        Some(change)
    }

    /// Drain every queued transition.
    pub fn drain(&mut self) -> Vec<PermissionChange> {
        std::iter::from_fn(|| self.try_changed()).collect()
    }
}
