//! Plugin registry.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::base::Plugin;

/// Ordered, build-once collection of plugins.
///
/// Registration order is load-bearing: pre-hooks run in registration order,
/// post-hooks in the reverse. Populate the registry during start-up, then
/// [`seal`](Self::seal) it into an `Arc` before the first execution; the
/// executor and shutdown coordinator only ever see the sealed, shared form.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    shut_down: AtomicBool,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn from_plugins<I>(plugins: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Plugin>>,
    {
        let mut registry = Self::new();
        for p in plugins {
            registry.register(p);
        }
        registry
    }

    /// Append a plugin and return its zero-based index.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> usize {
        let index = self.plugins.len();
        debug!(plugin_index = index, plugin = plugin.name(), "registered plugin");
        self.plugins.push(plugin);
        index
    }

    pub fn with<P: Plugin + 'static>(mut self, plugin: P) -> Self {
        self.register(Arc::new(plugin));
        self
    }

    /// Freeze the registry for shared, read-only use.
    pub fn seal(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// `(index, plugin)` pairs in registration order.
    pub fn forward(
        &self,
    ) -> impl DoubleEndedIterator<Item = (usize, &Arc<dyn Plugin>)> + ExactSizeIterator + Clone + '_
    {
        self.plugins.iter().enumerate()
    }

    /// `(index, plugin)` pairs in reverse registration order.
    pub fn reverse(
        &self,
    ) -> impl DoubleEndedIterator<Item = (usize, &Arc<dyn Plugin>)> + ExactSizeIterator + Clone + '_
    {
        self.forward().rev()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(index)
    }

    /// Index of the first plugin with this name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Claim the one-shot cleanup right. Returns false if already claimed.
    pub(crate) fn begin_shutdown(&self) -> bool {
        !self.shut_down.swap(true, Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
