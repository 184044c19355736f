//! Type catalog builder

use std::collections::HashMap;
use std::sync::Arc;

use geofed_core::BackendRef;
use tracing::{debug, info, warn};

use crate::config::AggregateConfig;
use crate::error::{AggregateError, AggregateResult};
use crate::pool::{TaskFailure, WorkerPool};
use crate::registry::BackendRegistry;
use crate::type_config::{StoreEntry, TypeConfiguration};

/// Immutable catalog snapshot.
///
/// Built in one piece and published whole; a query holds the snapshot it
/// started with even if the store is reconfigured meanwhile.
#[derive(Debug)]
pub struct Catalog {
    order: Vec<BackendRef>,
    type_names: Vec<String>,
    configurations: HashMap<String, Arc<TypeConfiguration>>,
}

impl Catalog {
    /// Build a catalog over `refs`, in that order.
    ///
    /// Backends list their types concurrently; the merge walks the results
    /// in configuration order so type order is first-seen across backends.
    pub async fn build(
        registry: &BackendRegistry,
        refs: &[BackendRef],
        pool: &WorkerPool,
        config: &AggregateConfig,
    ) -> AggregateResult<Self> {
        let mut order: Vec<BackendRef> = Vec::with_capacity(refs.len());
        for r in refs {
            if order.contains(r) {
                warn!(backend = %r, "Backend listed twice, ignoring repeat");
            } else {
                order.push(r.clone());
            }
        }
        let backends = registry.resolve(&order)?;

        let jobs = backends
            .iter()
            .map(|(backend_ref, backend)| {
                let backend = Arc::clone(backend);
                (backend_ref.clone(), async move { backend.list_type_names().await })
            })
            .collect();
        let listings = pool
            .gather(jobs)
            .await
            .map_err(TaskFailure::into_configuration_error)?;

        let mut type_names: Vec<String> = Vec::new();
        let mut configurations: HashMap<String, TypeConfiguration> = HashMap::new();
        for ((backend_ref, backend), native_names) in backends.into_iter().zip(listings) {
            debug!(backend = %backend_ref, types = native_names.len(), "Listed types");
            for native in native_names {
                let entry = StoreEntry::new(backend_ref.clone(), native.clone(), Arc::clone(&backend));
                match configurations.get_mut(&native) {
                    Some(existing) => {
                        if !existing.push(entry) {
                            warn!(
                                backend = %backend_ref,
                                type_name = %native,
                                "Backend lists type twice, ignoring repeat"
                            );
                        }
                    }
                    None => {
                        type_names.push(native.clone());
                        configurations.insert(native.clone(), TypeConfiguration::new(native, entry));
                    }
                }
            }
        }

        if config.eager_schemas {
            for name in &type_names {
                if let Some(cfg) = configurations.get(name) {
                    cfg.prefetch_schemas(pool)
                        .await
                        .map_err(TaskFailure::into_configuration_error)?;
                }
            }
        }

        info!(
            backends = order.len(),
            types = type_names.len(),
            "Built type catalog"
        );

        Ok(Self {
            order,
            type_names,
            configurations: configurations
                .into_iter()
                .map(|(k, v)| (k, Arc::new(v)))
                .collect(),
        })
    }

    /// Backends in configuration order
    pub fn order(&self) -> &[BackendRef] {
        &self.order
    }

    /// Logical type names, first-seen order
    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    pub fn configuration(&self, type_name: &str) -> Option<&Arc<TypeConfiguration>> {
        self.configurations.get(type_name)
    }

    /// Configuration for `type_name`, or `UnknownType`
    pub(crate) fn require(&self, type_name: &str) -> AggregateResult<Arc<TypeConfiguration>> {
        self.configurations
            .get(type_name)
            .cloned()
            .ok_or_else(|| AggregateError::UnknownType(type_name.to_string()))
    }
}
