//! Aggregating store - the federation façade

use std::sync::Arc;

use async_trait::async_trait;
use geofed_core::{
    BackendRef, BackendResult, Envelope, FeatureBackend, FeatureReader, Filter, Query, Schema,
};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::AggregateConfig;
use crate::error::{AggregateError, AggregateResult};
use crate::pool::WorkerPool;
use crate::registry::BackendRegistry;
use crate::source::FederatedFeatureSource;
use crate::type_config::TypeConfiguration;

/// State shared between the store and the sources it hands out
pub(crate) struct StoreShared {
    pub registry: Arc<BackendRegistry>,
    pub config: AggregateConfig,
    pub pool: WorkerPool,
    catalog: RwLock<Option<Arc<Catalog>>>,
    /// Serialises configure / reset
    lifecycle: Mutex<()>,
}

impl StoreShared {
    /// Current catalog, or `NotConfigured`
    pub fn snapshot(&self) -> AggregateResult<Arc<Catalog>> {
        self.catalog
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(AggregateError::NotConfigured)
    }
}

/// One logical store over many backends.
///
/// `auto_configure_stores` builds a catalog from the registry and publishes
/// it in a single swap. Queries read whichever catalog was current when they
/// started, so a concurrent configure or reset is never seen half done.
/// Cloning is cheap and clones share the catalog.
#[derive(Clone)]
pub struct AggregatingStore {
    shared: Arc<StoreShared>,
}

impl AggregatingStore {
    /// Create an unconfigured store over `registry`
    pub fn new(registry: Arc<BackendRegistry>, config: AggregateConfig) -> Self {
        let pool = WorkerPool::new(config.max_concurrent_backend_tasks);
        Self {
            shared: Arc::new(StoreShared {
                registry,
                config,
                pool,
                catalog: RwLock::new(None),
                lifecycle: Mutex::new(()),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.shared.registry
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.shared.config
    }

    /// Build the catalog over `refs` (in that order) and replace the
    /// current one. On error the previous catalog stays in place.
    pub async fn auto_configure_stores(&self, refs: &[BackendRef]) -> AggregateResult<()> {
        let _guard = self.shared.lifecycle.lock().await;
        let catalog = Catalog::build(
            &self.shared.registry,
            refs,
            &self.shared.pool,
            &self.shared.config,
        )
        .await?;
        info!(
            order = %refs.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            types = catalog.type_names().len(),
            "Configured aggregating store"
        );
        *self.shared.catalog.write() = Some(Arc::new(catalog));
        Ok(())
    }

    /// Drop the catalog and every cached schema
    pub async fn reset_configuration(&self) {
        let _guard = self.shared.lifecycle.lock().await;
        if self.shared.catalog.write().take().is_some() {
            info!("Reset aggregating store configuration");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.shared.catalog.read().is_some()
    }

    /// Backends of the current configuration, in order
    pub fn configured_order(&self) -> AggregateResult<Vec<BackendRef>> {
        Ok(self.shared.snapshot()?.order().to_vec())
    }

    /// Logical type names, first-seen order
    pub fn get_type_names(&self) -> AggregateResult<Vec<String>> {
        Ok(self.shared.snapshot()?.type_names().to_vec())
    }

    pub fn get_type_configuration(
        &self,
        type_name: &str,
    ) -> AggregateResult<Arc<TypeConfiguration>> {
        self.shared.snapshot()?.require(type_name)
    }

    /// Canonical schema of a logical type
    pub async fn get_schema(&self, type_name: &str) -> AggregateResult<Arc<Schema>> {
        self.get_type_configuration(type_name)?
            .canonical_schema()
            .await
    }

    /// Read path for a logical type
    pub fn get_feature_source(&self, type_name: &str) -> AggregateResult<FederatedFeatureSource> {
        self.get_type_configuration(type_name)?;
        Ok(FederatedFeatureSource::new(
            Arc::clone(&self.shared),
            type_name.to_string(),
        ))
    }
}

impl std::fmt::Debug for AggregatingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregatingStore")
            .field("backends", &self.shared.registry.len())
            .field("configured", &self.is_configured())
            .finish()
    }
}

/// An aggregate can itself be federated by another aggregate
#[async_trait]
impl FeatureBackend for AggregatingStore {
    fn kind(&self) -> &str {
        "aggregate"
    }

    async fn list_type_names(&self) -> BackendResult<Vec<String>> {
        Ok(self.get_type_names()?)
    }

    async fn get_schema(&self, type_name: &str) -> BackendResult<Schema> {
        let schema = AggregatingStore::get_schema(self, type_name).await?;
        Ok(schema.as_ref().clone())
    }

    async fn get_count(&self, type_name: &str, filter: &Filter) -> BackendResult<u64> {
        Ok(self.get_feature_source(type_name)?.count(filter).await?)
    }

    async fn get_bounds(
        &self,
        type_name: &str,
        filter: &Filter,
    ) -> BackendResult<Option<Envelope>> {
        Ok(self.get_feature_source(type_name)?.bounds(filter).await?)
    }

    async fn get_features(
        &self,
        type_name: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> BackendResult<FeatureReader> {
        let query = Query {
            type_name: type_name.to_string(),
            filter: filter.clone(),
            properties: projection.map(<[String]>::to_vec),
        };
        let collection = self.get_feature_source(type_name)?.features(query).await?;
        Ok(Box::new(collection.reader().await?))
    }
}
