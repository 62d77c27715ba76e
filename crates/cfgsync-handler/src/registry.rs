//! Kind → handler registry
//!
//! Built once by the caller and passed to the pipeline; there is no ambient
//! global lookup.

use crate::handler::Handler;
use crate::memory::{MemoryStore, YamlHandler};
use cfgsync_model::EntityKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Explicit mapping from entity kind to its handler
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EntityKind, Arc<dyn Handler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        f.debug_struct("HandlerRegistry")
            .field("handler_count", &self.handlers.len())
            .field("kinds", &kinds)
            .finish()
    }
}

impl HandlerRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry serving every catalogued kind from one in-memory store
    #[must_use]
    pub fn in_memory(store: &Arc<MemoryStore>) -> Self {
        let mut registry = Self::new();
        for kind in EntityKind::PROCESSING_ORDER {
            registry.register(YamlHandler::new(kind, Arc::clone(store)));
        }
        registry
    }

    /// Register a handler under its own kind, replacing any previous one
    pub fn register<H: Handler>(&mut self, handler: H) {
        self.register_arc(Arc::new(handler));
    }

    /// Register a shared handler under its own kind
    pub fn register_arc(&mut self, handler: Arc<dyn Handler>) {
        let kind = handler.kind();
        if self.handlers.insert(kind, handler).is_some() {
            tracing::debug!(%kind, "handler replaced");
        }
    }

    /// With a handler registered
    #[inline]
    #[must_use]
    pub fn with_handler<H: Handler>(mut self, handler: H) -> Self {
        self.register(handler);
        self
    }

    /// Handler for a kind
    #[inline]
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Whether a kind has a handler
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: EntityKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Number of registered handlers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_covers_catalogue() {
        let store = Arc::new(MemoryStore::new());
        let registry = HandlerRegistry::in_memory(&store);
        assert_eq!(registry.len(), EntityKind::PROCESSING_ORDER.len());
        assert!(registry.contains(EntityKind::Pipeline));
        assert_eq!(registry.get(EntityKind::Tag).map(|h| h.kind()), Some(EntityKind::Tag));
    }

    #[test]
    fn register_replaces() {
        let store = Arc::new(MemoryStore::new());
        let registry = HandlerRegistry::new()
            .with_handler(YamlHandler::new(EntityKind::Service, Arc::clone(&store)))
            .with_handler(YamlHandler::new(EntityKind::Service, store));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains(EntityKind::Workflow));
    }
}
