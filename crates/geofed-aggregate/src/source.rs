//! Federated feature source: per-type fan-out and merge

use std::collections::VecDeque;
use std::sync::Arc;

use geofed_core::{Crs, Envelope, Filter, Query, Schema};
use tracing::debug;

use crate::error::{AggregateError, AggregateResult};
use crate::pool::{TaskFailure, WorkerPool};
use crate::reader::{FederatedFeatureCollection, Route};
use crate::store::StoreShared;
use crate::type_config::{StoreEntry, TypeConfiguration};

/// Read path for one logical type.
///
/// The type configuration is looked up in the store's current catalog on
/// every call, so a source outlives reconfiguration without serving data
/// from a catalog that has been replaced or reset.
#[derive(Clone)]
pub struct FederatedFeatureSource {
    shared: Arc<StoreShared>,
    type_name: String,
}

impl FederatedFeatureSource {
    pub(crate) fn new(shared: Arc<StoreShared>, type_name: String) -> Self {
        Self { shared, type_name }
    }

    /// Logical type name
    pub fn name(&self) -> &str {
        &self.type_name
    }

    pub(crate) fn configuration(&self) -> AggregateResult<Arc<TypeConfiguration>> {
        self.shared.snapshot()?.require(&self.type_name)
    }

    pub(crate) fn pool(&self) -> &WorkerPool {
        &self.shared.pool
    }

    /// Canonical schema of the type
    pub async fn schema(&self) -> AggregateResult<Arc<Schema>> {
        self.configuration()?.canonical_schema().await
    }

    /// Number of features matching `filter`, summed over every backend
    pub async fn count(&self, filter: &Filter) -> AggregateResult<u64> {
        let config = self.configuration()?;
        let entries = route(&config, filter, None, self.pool()).await?;
        if entries.is_empty() {
            return Ok(0);
        }

        let filter = Arc::new(filter.clone());
        let jobs = entries
            .into_iter()
            .map(|entry| {
                let filter = Arc::clone(&filter);
                (entry.backend_ref.clone(), async move {
                    entry.backend.get_count(&entry.native_name, &filter).await
                })
            })
            .collect();
        let counts = self
            .pool()
            .gather(jobs)
            .await
            .map_err(TaskFailure::into_read_error)?;
        Ok(counts.into_iter().sum())
    }

    /// Union of the bounds of features matching `filter`.
    ///
    /// Envelopes are reprojected to the canonical geometry CRS before the
    /// union; `None` when no backend matched anything.
    pub async fn bounds(&self, filter: &Filter) -> AggregateResult<Option<Envelope>> {
        let config = self.configuration()?;
        let entries = route(&config, filter, None, self.pool()).await?;
        if entries.is_empty() {
            return Ok(None);
        }

        let filter = Arc::new(filter.clone());
        let jobs = entries
            .into_iter()
            .map(|entry| {
                let filter = Arc::clone(&filter);
                (entry.backend_ref.clone(), async move {
                    entry.backend.get_bounds(&entry.native_name, &filter).await
                })
            })
            .collect();
        let envelopes: Vec<Envelope> = self
            .pool()
            .gather(jobs)
            .await
            .map_err(TaskFailure::into_read_error)?
            .into_iter()
            .flatten()
            .collect();

        let Some(first) = envelopes.first() else {
            return Ok(None);
        };
        let target: Crs = config
            .canonical_schema()
            .await?
            .default_geometry()
            .and_then(|g| g.crs.clone())
            .unwrap_or_else(|| first.crs.clone());

        let reprojected = envelopes
            .iter()
            .map(|e| e.reproject(&target))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Envelope::union(&reprojected)?)
    }

    /// Features matching `query`, merged across backends.
    ///
    /// Validates the projection against the canonical schema. The returned
    /// collection is pinned to the catalog current at this call and opens
    /// backend cursors only when read.
    pub async fn features(&self, query: Query) -> AggregateResult<FederatedFeatureCollection> {
        if !query.type_name.is_empty() && query.type_name != self.type_name {
            return Err(AggregateError::UnknownType(query.type_name));
        }
        let config = self.configuration()?;
        let canonical = config.canonical_schema().await?;

        let schema = match &query.properties {
            Some(names) => {
                if let Some(missing) = names.iter().find(|n| !canonical.has_attribute(n)) {
                    return Err(AggregateError::UnknownAttribute {
                        type_name: self.type_name.clone(),
                        attribute: missing.clone(),
                    });
                }
                Arc::new(canonical.retain(names))
            }
            None => canonical,
        };

        Ok(FederatedFeatureCollection::new(
            config,
            self.pool().clone(),
            query,
            schema,
        ))
    }
}

impl std::fmt::Debug for FederatedFeatureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedFeatureSource")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Routes for a feature read, projection narrowed to each backend's schema
pub(crate) async fn plan_reads(
    config: &TypeConfiguration,
    filter: &Filter,
    properties: Option<&[String]>,
    pool: &WorkerPool,
) -> AggregateResult<VecDeque<Route>> {
    let entries = route(config, filter, properties, pool).await?;

    let mut routes = VecDeque::with_capacity(entries.len());
    for entry in entries {
        let projection = match properties {
            Some(names) => {
                let native = native_schema(&entry).await?;
                Some(
                    names
                        .iter()
                        .filter(|n| native.has_attribute(n))
                        .cloned()
                        .collect(),
                )
            }
            None => None,
        };
        routes.push_back(Route { entry, projection });
    }
    Ok(routes)
}

async fn native_schema(entry: &StoreEntry) -> AggregateResult<Arc<Schema>> {
    entry
        .native_schema()
        .await
        .map_err(|source| AggregateError::BackendRead {
            backend: entry.backend_ref.clone(),
            source,
        })
}

/// Backends that take part in a query, in mapping order.
///
/// A backend whose native schema lacks an attribute the filter references
/// can never match, so it is left out rather than called. `Exclude` routes
/// nowhere. Schemas are only fetched when there is something to check.
async fn route(
    config: &TypeConfiguration,
    filter: &Filter,
    properties: Option<&[String]>,
    pool: &WorkerPool,
) -> AggregateResult<Vec<Arc<StoreEntry>>> {
    if filter.is_exclude() {
        debug!(type_name = %config.name(), "Filter excludes everything, no backend called");
        return Ok(Vec::new());
    }

    let entries = config.entries();
    let referenced = filter.referenced_attributes();
    if referenced.is_empty() && properties.is_none() {
        return Ok(entries.to_vec());
    }

    let jobs = entries
        .iter()
        .map(|entry| {
            let entry = Arc::clone(entry);
            (entry.backend_ref.clone(), async move { entry.native_schema().await })
        })
        .collect();
    let schemas = pool
        .gather(jobs)
        .await
        .map_err(TaskFailure::into_read_error)?;

    let mut routed = Vec::with_capacity(entries.len());
    for (entry, schema) in entries.iter().zip(schemas) {
        match referenced.iter().find(|a| !schema.has_attribute(a)) {
            Some(missing) => debug!(
                backend = %entry.backend_ref,
                type_name = %config.name(),
                attribute = %missing,
                "Backend lacks filtered attribute, contributes nothing"
            ),
            None => {
                debug!(
                    backend = %entry.backend_ref,
                    type_name = %config.name(),
                    "Pushing filter down"
                );
                routed.push(Arc::clone(entry));
            }
        }
    }
    Ok(routed)
}
