//! Decision mechanisms for unresolved permissions.
//!
//! The registry never decides on its own: when a request reaches a record in
//! the `prompt` state it asks a [`PermissionPrompter`]. Hosts with a UI use
//! [`ChannelPrompter`]; headless hosts and tests use [`StaticPrompter`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use eden_core::error::PermissionError;
use eden_core::types::{PermissionDescriptor, PermissionState};

/// A human (or policy) decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Allow the operation
    Grant,
    /// Refuse the operation
    Deny,
}

impl From<Decision> for PermissionState {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Grant => PermissionState::Granted,
            Decision::Deny => PermissionState::Denied,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant => f.write_str("grant"),
            Self::Deny => f.write_str("deny"),
        }
    }
}

/// Resolves a prompt into a decision.
///
/// Implementations return `PermissionError::ResolutionUnavailable` when they
/// cannot decide; the record then stays in `prompt`.
#[async_trait]
pub trait PermissionPrompter: Send + Sync {
    /// Ask for a decision about `descriptor` (already normalized).
    async fn prompt(&self, descriptor: &PermissionDescriptor) -> Result<Decision, PermissionError>;
}

/// Answers every prompt with the same decision.
#[derive(Debug, Clone, Copy)]
pub struct StaticPrompter {
    decision: Decision,
}

impl StaticPrompter {
    /// Prompter that always returns `decision`.
    pub fn new(decision: Decision) -> Self {
        Self { decision }
    }

    /// Prompter that grants everything.
    pub fn allow_all() -> Self {
        Self::new(Decision::Grant)
    }

    /// Prompter that denies everything.
    pub fn deny_all() -> Self {
        Self::new(Decision::Deny)
    }
}

#[async_trait]
impl PermissionPrompter for StaticPrompter {
    async fn prompt(&self, descriptor: &PermissionDescriptor) -> Result<Decision, PermissionError> {
        debug!(%descriptor, decision = %self.decision, "Static prompt decision");
        Ok(self.decision)
    }
}

/// A pending prompt delivered to the host UI.
#[derive(Debug)]
pub struct PromptRequest {
    /// Normalized descriptor awaiting a decision
    pub descriptor: PermissionDescriptor,

    reply: oneshot::Sender<Decision>,
}

impl PromptRequest {
    /// Answer the prompt. Returns false if the requester is gone.
    pub fn respond(self, decision: Decision) -> bool {
        self.reply.send(decision).is_ok()
    }
}

/// Forwards prompts to the host over a channel.
///
/// Dropping the receiving end, or dropping a [`PromptRequest`] without
/// answering it, makes the resolution unavailable.
#[derive(Debug, Clone)]
pub struct ChannelPrompter {
    sender: mpsc::Sender<PromptRequest>,
}

impl ChannelPrompter {
    /// Create a prompter and the receiver the host UI reads from.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<PromptRequest>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl PermissionPrompter for ChannelPrompter {
    async fn prompt(&self, descriptor: &PermissionDescriptor) -> Result<Decision, PermissionError> {
        let (reply, answer) = oneshot::channel();
        let request = PromptRequest {
            descriptor: descriptor.clone(),
            reply,
        };

        self.sender
            .send(request)
            .await
            .map_err(|_| unavailable(descriptor, "prompt channel closed"))?;

        answer
            .await
            .map_err(|_| unavailable(descriptor, "prompt dismissed without a decision"))
    }
}

fn unavailable(descriptor: &PermissionDescriptor, reason: &str) -> PermissionError {
    PermissionError::ResolutionUnavailable {
        descriptor: descriptor.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_prompter() {
        let descriptor = PermissionDescriptor::net("example.com");
        assert_eq!(
            StaticPrompter::allow_all().prompt(&descriptor).await,
            Ok(Decision::Grant)
        );
        assert_eq!(
            StaticPrompter::deny_all().prompt(&descriptor).await,
            Ok(Decision::Deny)
        );
    }

    #[tokio::test]
    async fn test_channel_prompter_round_trip() {
        let (prompter, mut requests) = ChannelPrompter::new(4);
        let host = tokio::spawn(async move {
            let request = requests.recv().await.unwrap();
            assert_eq!(request.descriptor, PermissionDescriptor::read("/etc/passwd"));
            assert!(request.respond(Decision::Grant));
        });

        let decision = prompter
            .prompt(&PermissionDescriptor::read("/etc/passwd"))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Grant);
        host.await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_prompter_closed() {
        let (prompter, requests) = ChannelPrompter::new(1);
        drop(requests);
        let result = prompter.prompt(&PermissionDescriptor::Log).await;
        assert!(matches!(
            result,
            Err(PermissionError::ResolutionUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_channel_prompter_dismissed() {
        let (prompter, mut requests) = ChannelPrompter::new(1);
        tokio::spawn(async move {
            // Drop the request without answering
            let _ = requests.recv().await;
        });
        let result = prompter.prompt(&PermissionDescriptor::SystemCtl).await;
        assert!(matches!(
            result,
            Err(PermissionError::ResolutionUnavailable { .. })
        ));
    }

    #[test]
    fn test_decision_maps_to_state() {
        assert_eq!(PermissionState::from(Decision::Grant), PermissionState::Granted);
        assert_eq!(PermissionState::from(Decision::Deny), PermissionState::Denied);
    }
}
