//! Merged feature reader
//!
//! Concatenates backend cursors in mapping order. At most one backend
//! cursor is open at a time; every cursor that was opened is closed on
//! exhaustion, on error, on [`FederatedFeatureReader::close`] and on drop.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use geofed_core::{
    BackendError, BackendResult, Feature, FeatureCursor, FeatureReader, Filter, Query, Schema,
};
use tracing::{debug, warn};

use crate::error::{AggregateError, AggregateResult};
use crate::pool::WorkerPool;
use crate::source::plan_reads;
use crate::type_config::{StoreEntry, TypeConfiguration};

/// One backend to read from, with the projection it understands
pub(crate) struct Route {
    pub entry: Arc<StoreEntry>,
    pub projection: Option<Vec<String>>,
}

/// Result of [`FederatedFeatureSource::features`](crate::FederatedFeatureSource::features).
///
/// Holds the type configuration that was current when the query was made,
/// so every pass reads one catalog even if the store is reconfigured in
/// between. Restartable: every [`reader`](Self::reader) call opens fresh
/// cursors.
#[derive(Debug, Clone)]
pub struct FederatedFeatureCollection {
    config: Arc<TypeConfiguration>,
    pool: WorkerPool,
    query: Query,
    schema: Arc<Schema>,
}

impl FederatedFeatureCollection {
    pub(crate) fn new(
        config: Arc<TypeConfiguration>,
        pool: WorkerPool,
        query: Query,
        schema: Arc<Schema>,
    ) -> Self {
        Self {
            config,
            pool,
            query,
            schema,
        }
    }

    /// Schema of the yielded features: canonical, narrowed by the projection
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Open a new pass over the features
    pub async fn reader(&self) -> AggregateResult<FederatedFeatureReader> {
        let routes = plan_reads(
            &self.config,
            &self.query.filter,
            self.query.properties.as_deref(),
            &self.pool,
        )
        .await?;
        debug!(
            type_name = %self.config.name(),
            backends = routes.len(),
            "Opening federated reader"
        );
        Ok(FederatedFeatureReader {
            schema: Arc::clone(&self.schema),
            filter: Arc::new(self.query.filter.clone()),
            pending: routes,
            current: None,
            pool: self.pool.clone(),
            finished: false,
        })
    }

    /// Read every feature into memory
    pub async fn collect(&self) -> AggregateResult<Vec<Feature>> {
        let mut reader = self.reader().await?;
        let mut features = Vec::new();
        while let Some(feature) = reader.next().await? {
            features.push(feature);
        }
        Ok(features)
    }
}

struct ActiveCursor {
    entry: Arc<StoreEntry>,
    cursor: FeatureReader,
}

/// Lazy merged sequence over every contributing backend
pub struct FederatedFeatureReader {
    schema: Arc<Schema>,
    filter: Arc<Filter>,
    pending: VecDeque<Route>,
    current: Option<ActiveCursor>,
    pool: WorkerPool,
    finished: bool,
}

impl FederatedFeatureReader {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Next feature, retyped to the collection schema; `None` once every
    /// backend is exhausted.
    ///
    /// A backend failure releases every cursor and names the backend.
    pub async fn next(&mut self) -> AggregateResult<Option<Feature>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            if self.current.is_none() {
                let Some(route) = self.pending.pop_front() else {
                    self.finished = true;
                    return Ok(None);
                };
                let opened =
                    Self::open(self.pool.clone(), Arc::clone(&self.filter), &route).await;
                match opened {
                    Ok(cursor) => {
                        self.current = Some(ActiveCursor {
                            entry: route.entry,
                            cursor,
                        });
                    }
                    Err(source) => {
                        self.release();
                        return Err(AggregateError::BackendRead {
                            backend: route.entry.backend_ref.clone(),
                            source,
                        });
                    }
                }
            }
            let Some(active) = self.current.as_mut() else {
                continue;
            };

            match active.cursor.next().await {
                Ok(Some(feature)) => return Ok(Some(feature.retype(&self.schema))),
                Ok(None) => self.close_current(),
                Err(source) => {
                    let backend = active.entry.backend_ref.clone();
                    self.release();
                    return Err(AggregateError::BackendRead { backend, source });
                }
            }
        }
    }

    /// Release every open backend cursor; later reads yield nothing
    pub fn close(&mut self) {
        self.release();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Adapt into a [`Stream`]; it ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = AggregateResult<Feature>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut reader = state?;
            match reader.next().await {
                Ok(Some(feature)) => Some((Ok(feature), Some(reader))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    async fn open(
        pool: WorkerPool,
        filter: Arc<Filter>,
        route: &Route,
    ) -> BackendResult<FeatureReader> {
        let _permit = pool.acquire().await;
        let entry = &route.entry;
        debug!(backend = %entry.backend_ref, type_name = %entry.native_name, "Opening backend cursor");
        entry
            .backend
            .get_features(&entry.native_name, &filter, route.projection.as_deref())
            .await
    }

    fn close_current(&mut self) {
        if let Some(mut active) = self.current.take() {
            if let Err(e) = active.cursor.close() {
                warn!(
                    backend = %active.entry.backend_ref,
                    error = %e,
                    "Failed to close backend cursor"
                );
            }
        }
    }

    fn release(&mut self) {
        self.close_current();
        self.pending.clear();
        self.finished = true;
    }
}

impl Drop for FederatedFeatureReader {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl FeatureCursor for FederatedFeatureReader {
    async fn next(&mut self) -> BackendResult<Option<Feature>> {
        FederatedFeatureReader::next(self)
            .await
            .map_err(BackendError::from)
    }

    fn close(&mut self) -> BackendResult<()> {
        self.release();
        Ok(())
    }
}
