//! What an extension looks like to the host.

use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use eden_core::types::PackageOptions;

use super::context::ExecuteContext;

/// An entry or ready handler.
///
/// Handlers receive the invocation context and the hook arguments
/// (`[stage literal, source]`) and return an arbitrary JSON value, which the
/// boundary discards.
pub type Handler =
    Arc<dyn Fn(ExecuteContext, Vec<Value>) -> BoxFuture<'static, eden_core::Result<Value>> + Send + Sync>;

/// Handlers an extension registered during setup.
#[derive(Default, Clone)]
pub struct PluginScript {
    entries: Vec<Handler>,
    ready: Vec<Handler>,
}

fn into_handler<F, Fut>(handler: F) -> Handler
where
    F: Fn(ExecuteContext, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = eden_core::Result<Value>> + Send + 'static,
{
    Arc::new(move |ctx, args| Box::pin(handler(ctx, args)))
}

impl PluginScript {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry handler. Entries run first, in registration order.
    pub fn use_entry<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(ExecuteContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eden_core::Result<Value>> + Send + 'static,
    {
        self.entries.push(into_handler(handler));
        self
    }

    /// Add a ready handler. Ready handlers run after every entry succeeded.
    pub fn use_ready<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(ExecuteContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eden_core::Result<Value>> + Send + 'static,
    {
        self.ready.push(into_handler(handler));
        self
    }

    /// Entry handlers in registration order.
    pub fn entries(&self) -> &[Handler] {
        &self.entries
    }

    /// Ready handlers in registration order.
    pub fn ready(&self) -> &[Handler] {
        &self.ready
    }

    /// True if no handler was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.ready.is_empty()
    }
}

/// Extension code, as produced by an [`ExtensionLoader`].
///
/// [`ExtensionLoader`]: super::loader::ExtensionLoader
pub trait Extension: Send + Sync {
    /// Metadata the extension declares about itself.
    fn package(&self) -> PackageOptions;

    /// Register handlers. Called once per load.
    fn setup(&self, script: &mut PluginScript);
}

/// An extension assembled from a package declaration and a setup closure.
pub struct FnExtension<S> {
    package: PackageOptions,
    setup: S,
}

impl<S> FnExtension<S>
where
    S: Fn(&mut PluginScript) + Send + Sync,
{
    /// Create an extension from its package metadata and setup function.
    pub fn new(package: PackageOptions, setup: S) -> Self {
        Self { package, setup }
    }
}

impl<S> Extension for FnExtension<S>
where
    S: Fn(&mut PluginScript) + Send + Sync,
{
    fn package(&self) -> PackageOptions {
        self.package.clone()
    }

    fn setup(&self, script: &mut PluginScript) {
        (self.setup)(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_keeps_registration_order() {
        let extension = FnExtension::new(PackageOptions::new("demo", "1.0.0"), |script| {
            script
                .use_entry(|_, _| async { Ok(Value::from(1)) })
                .use_entry(|_, _| async { Ok(Value::from(2)) })
                .use_ready(|_, _| async { Ok(Value::Null) });
        });

        let mut script = PluginScript::new();
        assert!(script.is_empty());
        extension.setup(&mut script);

        assert_eq!(script.entries().len(), 2);
        assert_eq!(script.ready().len(), 1);
        assert_eq!(extension.package().name, "demo");
    }
}
