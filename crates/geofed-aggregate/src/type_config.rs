//! Per logical type configuration

use std::sync::Arc;

use geofed_core::{BackendRef, BackendResult, FeatureBackend, Schema};
use tokio::sync::OnceCell;

use crate::error::{AggregateError, AggregateResult};
use crate::pool::{TaskFailure, WorkerPool};

/// One backend's contribution to a logical type
pub(crate) struct StoreEntry {
    pub backend_ref: BackendRef,
    pub native_name: String,
    pub backend: Arc<dyn FeatureBackend>,
    schema: OnceCell<Arc<Schema>>,
}

impl StoreEntry {
    pub fn new(
        backend_ref: BackendRef,
        native_name: String,
        backend: Arc<dyn FeatureBackend>,
    ) -> Self {
        Self {
            backend_ref,
            native_name,
            backend,
            schema: OnceCell::new(),
        }
    }

    /// Native schema, fetched on first use and cached
    pub async fn native_schema(&self) -> BackendResult<Arc<Schema>> {
        self.schema
            .get_or_try_init(|| async {
                self.backend
                    .get_schema(&self.native_name)
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }
}

/// How one logical type maps onto backends.
///
/// The store map keeps configuration order; its first entry supplies the
/// canonical schema. Schemas are cached for the lifetime of the
/// configuration, which ends on reset or reconfigure.
pub struct TypeConfiguration {
    name: String,
    stores: Vec<Arc<StoreEntry>>,
}

impl TypeConfiguration {
    pub(crate) fn new(name: String, first: StoreEntry) -> Self {
        Self {
            name,
            stores: vec![Arc::new(first)],
        }
    }

    /// Add a contributing backend; a backend already present is ignored
    pub(crate) fn push(&mut self, entry: StoreEntry) -> bool {
        if self.contains(&entry.backend_ref) {
            return false;
        }
        self.stores.push(Arc::new(entry));
        true
    }

    /// Logical type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `(backend, native type name)` pairs in configuration order
    pub fn store_map(&self) -> impl Iterator<Item = (&BackendRef, &str)> {
        self.stores
            .iter()
            .map(|e| (&e.backend_ref, e.native_name.as_str()))
    }

    /// Native type name a backend uses for this type
    pub fn native_name(&self, backend_ref: &BackendRef) -> Option<&str> {
        self.stores
            .iter()
            .find(|e| &e.backend_ref == backend_ref)
            .map(|e| e.native_name.as_str())
    }

    pub fn contains(&self, backend_ref: &BackendRef) -> bool {
        self.stores.iter().any(|e| &e.backend_ref == backend_ref)
    }

    /// Number of contributing backends
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Backend whose schema is canonical
    pub fn primary_backend(&self) -> &BackendRef {
        &self.stores[0].backend_ref
    }

    pub(crate) fn entries(&self) -> &[Arc<StoreEntry>] {
        &self.stores
    }

    /// Canonical schema: exactly the first backend's native schema
    pub async fn canonical_schema(&self) -> AggregateResult<Arc<Schema>> {
        let primary = &self.stores[0];
        primary
            .native_schema()
            .await
            .map_err(|source| AggregateError::BackendRead {
                backend: primary.backend_ref.clone(),
                source,
            })
    }

    /// Fetch every native schema concurrently
    pub(crate) async fn prefetch_schemas(&self, pool: &WorkerPool) -> Result<(), TaskFailure> {
        let jobs = self
            .stores
            .iter()
            .map(|entry| {
                let entry = Arc::clone(entry);
                (entry.backend_ref.clone(), async move {
                    entry.native_schema().await.map(|_| ())
                })
            })
            .collect();
        pool.gather(jobs).await.map(|_| ())
    }
}

impl std::fmt::Debug for TypeConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeConfiguration")
            .field("name", &self.name)
            .field(
                "stores",
                &self
                    .store_map()
                    .map(|(r, n)| format!("{} -> {}", r, n))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
