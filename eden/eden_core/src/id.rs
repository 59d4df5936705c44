//! Strongly-typed identifiers.
//!
//! Identifiers are UUIDs tagged with a phantom marker so that, for example,
//! a subscription id can never be passed where an invocation id is expected.
//!
//! ```
//! use eden_core::id::{InvocationId, PackageId};
//!
//! let package = PackageId::new();
//! let invocation = InvocationId::new();
//! assert_ne!(package.uuid(), invocation.uuid());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// A UUID specialized by the marker type `T`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

// Manual impls: derives would require `T: Clone`, `T: Eq`, ... on the marker.
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.uuid.cmp(&other.uuid)
    }
}

impl<T> Id<T> {
    /// Create a new random (v4) identifier.
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Wrap a known UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: PhantomData,
        }
    }

    /// The underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The all-zero identifier.
    pub fn nil() -> Self {
        Self::from_uuid(Uuid::nil())
    }

    /// Check whether this is the all-zero identifier.
    pub fn is_nil(&self) -> bool {
        self.uuid.is_nil()
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from_uuid)
    }
}

/// Marker type for loaded packages.
#[derive(Debug)]
pub struct PackageMarker;
/// Identifier assigned to a package each time its extension is loaded.
pub type PackageId = Id<PackageMarker>;

/// Marker type for hook invocations.
#[derive(Debug)]
pub struct InvocationMarker;
/// Identifier of a single hook invocation.
pub type InvocationId = Id<InvocationMarker>;

/// Marker type for permission subscriptions.
#[derive(Debug)]
pub struct SubscriptionMarker;
/// Identifier of a permission change subscription.
pub type SubscriptionId = Id<SubscriptionMarker>;
