//! In-memory feature backend
//!
//! Holds feature types and rows in process memory. Filters are evaluated
//! natively, and like a real store the backend rejects filters and
//! projections naming attributes its schema lacks. Cursor bookkeeping and
//! fault injection hooks make it usable as a test double.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geofed_core::{
    BackendError, BackendRef, BackendResult, Envelope, Feature, FeatureBackend, FeatureCursor,
    FeatureReader, Filter, Schema,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::MemoryBackendConfig;
use crate::geojson;

/// Cursor open/close accounting
#[derive(Debug, Default)]
pub struct CursorStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    leaked: AtomicUsize,
}

impl CursorStats {
    /// Cursors handed out
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Cursors closed explicitly
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Cursors dropped without being closed
    pub fn leaked(&self) -> usize {
        self.leaked.load(Ordering::SeqCst)
    }

    /// Cursors currently open
    pub fn open_now(&self) -> usize {
        self.opened() - self.closed() - self.leaked()
    }
}

/// Fault injection switches
#[derive(Debug, Default)]
struct Faults {
    fail_listing: AtomicBool,
    fail_schema: AtomicBool,
    fail_reads: AtomicBool,
    fail_close: AtomicBool,
    /// Cursor errors after yielding this many features
    fail_stream_after: RwLock<Option<usize>>,
}

struct MemoryType {
    schema: Arc<Schema>,
    features: Vec<Feature>,
}

/// Feature backend keeping everything in memory
pub struct MemoryBackend {
    backend_ref: BackendRef,
    latency: Duration,
    types: RwLock<Vec<MemoryType>>,
    stats: Arc<CursorStats>,
    faults: Arc<Faults>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new(backend_ref: BackendRef) -> Self {
        Self {
            backend_ref,
            latency: Duration::ZERO,
            types: RwLock::new(Vec::new()),
            stats: Arc::new(CursorStats::default()),
            faults: Arc::new(Faults::default()),
        }
    }

    /// Build a backend from configuration, loading GeoJSON files as needed
    pub fn from_config(config: &MemoryBackendConfig) -> BackendResult<Self> {
        let mut backend = Self::new(config.backend_ref());
        backend.latency = Duration::from_millis(config.latency_ms);

        for type_config in &config.types {
            let mut rows: Vec<geojson::Row> = Vec::new();
            if let Some(path) = &type_config.geojson {
                rows.extend(geojson::load_feature_collection(&type_config.name, path)?);
            }
            rows.extend(
                type_config
                    .features
                    .iter()
                    .map(|f| (f.id.clone(), f.values.clone())),
            );

            let schema = if type_config.attributes.is_empty() {
                geojson::infer_schema(&type_config.name, &rows)
            } else {
                Schema::new(&type_config.name, type_config.attributes.clone())
            };

            let schema = backend.add_type(schema);
            for (id, values) in rows {
                let mut feature = Feature::new(id, Arc::clone(&schema));
                for (name, value) in values {
                    feature.set(name, value);
                }
                backend.add_feature(&type_config.name, feature)?;
            }
        }

        info!(
            backend = %backend.backend_ref,
            types = backend.types.read().len(),
            "Created memory backend"
        );
        Ok(backend)
    }

    pub fn backend_ref(&self) -> &BackendRef {
        &self.backend_ref
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Register a feature type; returns the shared schema to build features with.
    /// Re-adding a type replaces its schema and drops its rows.
    pub fn add_type(&self, schema: Schema) -> Arc<Schema> {
        let schema = Arc::new(schema);
        let mut types = self.types.write();
        let entry = MemoryType {
            schema: Arc::clone(&schema),
            features: Vec::new(),
        };
        match types
            .iter_mut()
            .find(|t| t.schema.type_name == schema.type_name)
        {
            Some(existing) => *existing = entry,
            None => types.push(entry),
        }
        schema
    }

    /// Append a feature; it is retyped to the registered schema
    pub fn add_feature(&self, type_name: &str, feature: Feature) -> BackendResult<()> {
        let mut types = self.types.write();
        let ty = types
            .iter_mut()
            .find(|t| t.schema.type_name == type_name)
            .ok_or_else(|| BackendError::TypeNotFound(type_name.to_string()))?;
        let feature = feature.retype(&ty.schema);
        ty.features.push(feature);
        Ok(())
    }

    /// Cursor accounting shared with every cursor this backend opened
    pub fn stats(&self) -> Arc<CursorStats> {
        Arc::clone(&self.stats)
    }

    /// Make `list_type_names` fail with an I/O error
    pub fn set_fail_listing(&self, fail: bool) {
        self.faults.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make `get_schema` fail with an I/O error
    pub fn set_fail_schema(&self, fail: bool) {
        self.faults.fail_schema.store(fail, Ordering::SeqCst);
    }

    /// Make count, bounds and cursor opening fail with an I/O error
    pub fn set_fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make cursor `close` report an error (the cursor is still released)
    pub fn set_fail_close(&self, fail: bool) {
        self.faults.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Make cursors fail after yielding `n` features
    pub fn set_fail_stream_after(&self, n: Option<usize>) {
        *self.faults.fail_stream_after.write() = n;
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn check_reads(&self) -> BackendResult<()> {
        if self.faults.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::Io(format!(
                "{}: simulated read failure",
                self.backend_ref
            )));
        }
        Ok(())
    }

    fn schema_of(&self, type_name: &str) -> BackendResult<Arc<Schema>> {
        self.types
            .read()
            .iter()
            .find(|t| t.schema.type_name == type_name)
            .map(|t| Arc::clone(&t.schema))
            .ok_or_else(|| BackendError::TypeNotFound(type_name.to_string()))
    }

    /// Reject names the schema does not declare
    fn validate_attributes<'a>(
        schema: &Schema,
        names: impl IntoIterator<Item = &'a String>,
    ) -> BackendResult<()> {
        for name in names {
            if !schema.has_attribute(name) {
                return Err(BackendError::AttributeNotFound {
                    type_name: schema.type_name.clone(),
                    attribute: name.clone(),
                });
            }
        }
        Ok(())
    }

    fn matching(&self, type_name: &str, filter: &Filter) -> BackendResult<Vec<Feature>> {
        let types = self.types.read();
        let ty = types
            .iter()
            .find(|t| t.schema.type_name == type_name)
            .ok_or_else(|| BackendError::TypeNotFound(type_name.to_string()))?;
        Self::validate_attributes(&ty.schema, &filter.referenced_attributes())?;
        Ok(ty
            .features
            .iter()
            .filter(|f| filter.evaluate(f))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FeatureBackend for MemoryBackend {
    fn kind(&self) -> &str {
        "memory"
    }

    async fn list_type_names(&self) -> BackendResult<Vec<String>> {
        self.simulate_latency().await;
        if self.faults.fail_listing.load(Ordering::SeqCst) {
            return Err(BackendError::Io(format!(
                "{}: simulated listing failure",
                self.backend_ref
            )));
        }
        Ok(self
            .types
            .read()
            .iter()
            .map(|t| t.schema.type_name.clone())
            .collect())
    }

    async fn get_schema(&self, type_name: &str) -> BackendResult<Schema> {
        self.simulate_latency().await;
        if self.faults.fail_schema.load(Ordering::SeqCst) {
            return Err(BackendError::Io(format!(
                "{}: simulated schema failure",
                self.backend_ref
            )));
        }
        Ok(self.schema_of(type_name)?.as_ref().clone())
    }

    async fn get_count(&self, type_name: &str, filter: &Filter) -> BackendResult<u64> {
        self.simulate_latency().await;
        self.check_reads()?;
        Ok(self.matching(type_name, filter)?.len() as u64)
    }

    async fn get_bounds(
        &self,
        type_name: &str,
        filter: &Filter,
    ) -> BackendResult<Option<Envelope>> {
        self.simulate_latency().await;
        self.check_reads()?;
        let bounds: Vec<Envelope> = self
            .matching(type_name, filter)?
            .iter()
            .filter_map(Feature::bounds)
            .collect();
        Ok(Envelope::union(&bounds)?)
    }

    async fn get_features(
        &self,
        type_name: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> BackendResult<FeatureReader> {
        self.simulate_latency().await;
        self.check_reads()?;

        let mut features = self.matching(type_name, filter)?;
        if let Some(names) = projection {
            let schema = self.schema_of(type_name)?;
            Self::validate_attributes(&schema, names)?;
            let projected = Arc::new(schema.retain(names));
            features = features
                .into_iter()
                .map(|f| f.retype(&projected))
                .collect();
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        debug!(
            backend = %self.backend_ref,
            type_name = %type_name,
            rows = features.len(),
            "Opened memory cursor"
        );

        Ok(Box::new(MemoryCursor {
            backend_ref: self.backend_ref.clone(),
            features: features.into_iter(),
            yielded: 0,
            fail_after: *self.faults.fail_stream_after.read(),
            stats: Arc::clone(&self.stats),
            faults: Arc::clone(&self.faults),
            closed: false,
        }))
    }
}

/// Cursor over a snapshot of matching rows
struct MemoryCursor {
    backend_ref: BackendRef,
    features: std::vec::IntoIter<Feature>,
    yielded: usize,
    fail_after: Option<usize>,
    stats: Arc<CursorStats>,
    faults: Arc<Faults>,
    closed: bool,
}

#[async_trait]
impl FeatureCursor for MemoryCursor {
    async fn next(&mut self) -> BackendResult<Option<Feature>> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        if self.fail_after.is_some_and(|n| self.yielded >= n) {
            return Err(BackendError::Io(format!(
                "{}: simulated stream failure after {} features",
                self.backend_ref, self.yielded
            )));
        }
        let next = self.features.next();
        if next.is_some() {
            self.yielded += 1;
        }
        Ok(next)
    }

    fn close(&mut self) -> BackendResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_close.load(Ordering::SeqCst) {
            return Err(BackendError::Io(format!(
                "{}: simulated close failure",
                self.backend_ref
            )));
        }
        Ok(())
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        if !self.closed {
            self.stats.leaked.fetch_add(1, Ordering::SeqCst);
            warn!(backend = %self.backend_ref, "Memory cursor dropped without close");
        }
    }
}
