//! # Eden Permission
//!
//! Capability-based permission engine for the Eden extension host.
//!
//! Every privileged operation an extension performs is checked against a
//! [`PermissionRegistry`]. Each normalized descriptor has a record in one of
//! three states (`granted`, `denied`, `prompt`). `prompt` records are resolved
//! by a [`PermissionPrompter`] on demand, decisions are persisted through a
//! [`DecisionStore`], and transitions are broadcast to subscribers.
//!
//! ```
//! # async fn demo() {
//! use eden_core::types::{PermissionDescriptor, PermissionState};
//! use eden_permission::{PermissionRegistry, StaticPrompter};
//!
//! let registry = PermissionRegistry::builder()
//!     .prompter(StaticPrompter::allow_all())
//!     .build();
//!
//! let passwd = PermissionDescriptor::read("/etc/passwd");
//! assert_eq!(registry.query(&passwd), PermissionState::Prompt);
//! assert_eq!(registry.request(&passwd).await, Ok(PermissionState::Granted));
//! assert_eq!(registry.query(&passwd), PermissionState::Granted);
//! # }
//! ```

pub mod prompt;
mod record;
pub mod registry;
pub mod store;
pub mod subscription;

pub use prompt::{ChannelPrompter, Decision, PermissionPrompter, PromptRequest, StaticPrompter};
pub use registry::{PermissionRegistry, PermissionRegistryBuilder};
pub use store::{DecisionStore, InMemoryDecisionStore, JsonFileDecisionStore, StoredDecision};
pub use subscription::{PermissionChange, PermissionStatus};
