//! Backend registry

use std::collections::HashMap;
use std::sync::Arc;

use geofed_core::{BackendRef, FeatureBackend};
use tracing::info;

use crate::error::{AggregateError, AggregateResult};

/// Configured backends, addressable by [`BackendRef`].
///
/// The aggregating store only reads the registry; it is shared behind an
/// `Arc` and never mutated once handed over.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendRef, Arc<dyn FeatureBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, returning the one it replaced
    pub fn register(
        &mut self,
        backend_ref: BackendRef,
        backend: Arc<dyn FeatureBackend>,
    ) -> Option<Arc<dyn FeatureBackend>> {
        info!(backend = %backend_ref, kind = backend.kind(), "Registering backend");
        self.backends.insert(backend_ref, backend)
    }

    /// Remove a backend
    pub fn unregister(&mut self, backend_ref: &BackendRef) -> Option<Arc<dyn FeatureBackend>> {
        let removed = self.backends.remove(backend_ref);
        if removed.is_some() {
            info!(backend = %backend_ref, "Unregistered backend");
        }
        removed
    }

    pub fn get(&self, backend_ref: &BackendRef) -> Option<&Arc<dyn FeatureBackend>> {
        self.backends.get(backend_ref)
    }

    /// All registered references, sorted for stable output
    pub fn refs(&self) -> Vec<BackendRef> {
        let mut refs: Vec<_> = self.backends.keys().cloned().collect();
        refs.sort();
        refs
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Look up every reference, in order
    pub(crate) fn resolve(
        &self,
        refs: &[BackendRef],
    ) -> AggregateResult<Vec<(BackendRef, Arc<dyn FeatureBackend>)>> {
        refs.iter()
            .map(|r| {
                self.backends
                    .get(r)
                    .map(|b| (r.clone(), Arc::clone(b)))
                    .ok_or_else(|| AggregateError::UnknownBackend(r.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofed_memory::MemoryBackend;

    fn memory(name: &str) -> Arc<dyn FeatureBackend> {
        Arc::new(MemoryBackend::new(BackendRef::new(name)))
    }

    #[test]
    fn register_and_replace() {
        let mut registry = BackendRegistry::new();
        assert!(registry.register(BackendRef::new("a"), memory("a")).is_none());
        assert!(registry.register(BackendRef::new("a"), memory("a")).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn refs_are_sorted() {
        let mut registry = BackendRegistry::new();
        registry.register(BackendRef::new("store2"), memory("store2"));
        registry.register(BackendRef::with_namespace("gt", "store3"), memory("store3"));
        registry.register(BackendRef::new("store1"), memory("store1"));
        let names: Vec<_> = registry.refs().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["store1", "store2", "gt:store3"]);
    }

    #[test]
    fn resolve_reports_unknown_backend() {
        let mut registry = BackendRegistry::new();
        registry.register(BackendRef::new("store1"), memory("store1"));
        let err = registry
            .resolve(&[BackendRef::new("store1"), BackendRef::new("nope")])
            .err()
            .unwrap();
        assert!(matches!(err, AggregateError::UnknownBackend(r) if r.name() == "nope"));
    }

    #[test]
    fn unregister_removes() {
        let mut registry = BackendRegistry::new();
        registry.register(BackendRef::new("store1"), memory("store1"));
        assert!(registry.unregister(&BackendRef::new("store1")).is_some());
        assert!(registry.is_empty());
    }
}
