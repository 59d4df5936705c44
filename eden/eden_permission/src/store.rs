//! Persistence of permission decisions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use eden_core::error::PermissionError;
use eden_core::types::{PermissionDescriptor, PermissionState};

/// One persisted decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDecision {
    /// Normalized descriptor
    pub descriptor: PermissionDescriptor,

    /// Decided state (`granted` or `denied`)
    pub state: PermissionState,
}

/// Storage backend for decisions that survive the registry.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Load every persisted decision.
    async fn load(&self) -> Result<Vec<StoredDecision>, PermissionError>;

    /// Persist the decision for `descriptor`, replacing any earlier one.
    async fn save(
        &self,
        descriptor: &PermissionDescriptor,
        state: PermissionState,
    ) -> Result<(), PermissionError>;
}

/// Keeps decisions for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct InMemoryDecisionStore {
    decisions: parking_lot::Mutex<BTreeMap<PermissionDescriptor, PermissionState>>,
}

impl InMemoryDecisionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored decisions.
    pub fn len(&self) -> usize {
        self.decisions.lock().len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.decisions.lock().is_empty()
    }
}

#[async_trait]
impl DecisionStore for InMemoryDecisionStore {
    async fn load(&self) -> Result<Vec<StoredDecision>, PermissionError> {
        Ok(to_entries(&self.decisions.lock()))
    }

    async fn save(
        &self,
        descriptor: &PermissionDescriptor,
        state: PermissionState,
    ) -> Result<(), PermissionError> {
        self.decisions.lock().insert(descriptor.clone(), state);
        Ok(())
    }
}

/// Stores decisions as a JSON array of `{descriptor, state}` entries.
///
/// The whole file is rewritten on every save; a missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileDecisionStore {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<PermissionDescriptor, PermissionState>>>,
}

impl JsonFileDecisionStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<BTreeMap<PermissionDescriptor, PermissionState>, PermissionError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(PermissionError::Store(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let entries: Vec<StoredDecision> = serde_json::from_str(&content).map_err(|e| {
            PermissionError::Store(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        Ok(entries
            .into_iter()
            .map(|entry| (entry.descriptor.normalize(), entry.state))
            .collect())
    }

    async fn write_file(
        &self,
        decisions: &BTreeMap<PermissionDescriptor, PermissionState>,
    ) -> Result<(), PermissionError> {
        let json = serde_json::to_string_pretty(&to_entries(decisions))
            .map_err(|e| PermissionError::Store(format!("Failed to serialize decisions: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PermissionError::Store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        // Write next to the target and rename so readers never see a torn file
        let temp = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp, json).await.map_err(|e| {
            PermissionError::Store(format!("Failed to write {}: {}", temp.display(), e))
        })?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            PermissionError::Store(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        debug!(path = %self.path.display(), count = decisions.len(), "Decisions written");
        Ok(())
    }
}

#[async_trait]
impl DecisionStore for JsonFileDecisionStore {
    async fn load(&self) -> Result<Vec<StoredDecision>, PermissionError> {
        let mut cache = self.cache.lock().await;
        let decisions = self.read_file().await?;
        let entries = to_entries(&decisions);
        *cache = Some(decisions);
        Ok(entries)
    }

    async fn save(
        &self,
        descriptor: &PermissionDescriptor,
        state: PermissionState,
    ) -> Result<(), PermissionError> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.read_file().await?);
        }

        let decisions = cache.get_or_insert_with(BTreeMap::new);
        decisions.insert(descriptor.clone(), state);
        self.write_file(decisions).await
    }
}

fn to_entries(decisions: &BTreeMap<PermissionDescriptor, PermissionState>) -> Vec<StoredDecision> {
    decisions
        .iter()
        .map(|(descriptor, state)| StoredDecision {
            descriptor: descriptor.clone(),
            state: *state,
        })
        .collect()
}
