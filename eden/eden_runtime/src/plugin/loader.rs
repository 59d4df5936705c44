//! Resolving hook sources to extension code.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use eden_core::error::PluginError;
use eden_core::types::HookSource;

use super::extension::Extension;

/// Loads the extension a hook source points at.
#[async_trait]
pub trait ExtensionLoader: Send + Sync {
    /// Load `source`. A source that does not exist is `ResourceNotFound`.
    async fn load(&self, source: &HookSource) -> Result<Arc<dyn Extension>, PluginError>;
}

/// In-process catalogue of extensions keyed by hook source.
#[derive(Clone, Default)]
pub struct StaticExtensionLoader {
    extensions: Arc<DashMap<HookSource, Arc<dyn Extension>>>,
}

impl StaticExtensionLoader {
    /// Empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `extension` loadable from `source`, replacing any previous one.
    pub fn insert(&self, source: HookSource, extension: Arc<dyn Extension>) {
        debug!(%source, "Extension added to catalogue");
        self.extensions.insert(source, extension);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, source: HookSource, extension: impl Extension + 'static) -> Self {
        self.insert(source, Arc::new(extension));
        self
    }

    /// Remove `source`, returning whether it was present.
    pub fn remove(&self, source: &HookSource) -> bool {
        self.extensions.remove(source).is_some()
    }

    /// Number of catalogued sources.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// True if nothing is catalogued.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

#[async_trait]
impl ExtensionLoader for StaticExtensionLoader {
    async fn load(&self, source: &HookSource) -> Result<Arc<dyn Extension>, PluginError> {
        self.extensions
            .get(source)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| PluginError::ResourceNotFound(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::extension::FnExtension;
    use eden_core::types::PackageOptions;

    #[tokio::test]
    async fn test_load_by_normalized_source() {
        let loader = StaticExtensionLoader::new().with(
            HookSource::parse("/plugins/a/hook.js").unwrap(),
            FnExtension::new(PackageOptions::new("a", "1.0.0"), |_| {}),
        );

        let same = HookSource::parse("file:///plugins/a/./hook.js").unwrap();
        let extension = loader.load(&same).await.unwrap();
        assert_eq!(extension.package().name, "a");

        let missing = HookSource::parse("/plugins/b/hook.js").unwrap();
        assert!(matches!(
            loader.load(&missing).await,
            Err(PluginError::ResourceNotFound(_))
        ));

        assert!(loader.remove(&same));
        assert!(loader.is_empty());
    }
}
