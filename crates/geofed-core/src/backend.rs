//! FeatureBackend trait - the core abstraction for federated stores

use async_trait::async_trait;

use crate::error::{BackendError, BackendResult};
use crate::models::{Envelope, Feature, Filter, Schema};

/// A closable, lazily pulled sequence of features.
///
/// `close` releases whatever the cursor holds (file handles, connections,
/// snapshots). It must be idempotent; `next` after `close` fails with
/// [`BackendError::Closed`].
#[async_trait]
pub trait FeatureCursor: Send {
    /// Pull the next feature, `None` once exhausted
    async fn next(&mut self) -> BackendResult<Option<Feature>>;

    /// Release the cursor's resources
    fn close(&mut self) -> BackendResult<()>;
}

/// Owned cursor handed out by backends
pub type FeatureReader = Box<dyn FeatureCursor>;

/// The capability interface every federated store implements.
///
/// Type names passed in are the backend's *native* names. Backends are
/// expected to be safe for concurrent reads.
#[async_trait]
pub trait FeatureBackend: Send + Sync {
    /// Short description of the backend kind, used in logs
    fn kind(&self) -> &str {
        "backend"
    }

    /// Native type names, in the backend's own order
    async fn list_type_names(&self) -> BackendResult<Vec<String>>;

    /// Schema of a native type
    async fn get_schema(&self, type_name: &str) -> BackendResult<Schema>;

    /// Number of features matching `filter`
    async fn get_count(&self, type_name: &str, filter: &Filter) -> BackendResult<u64>;

    /// Bounds of the features matching `filter`; `None` when nothing matches
    async fn get_bounds(&self, type_name: &str, filter: &Filter)
        -> BackendResult<Option<Envelope>>;

    /// Open a cursor over the features matching `filter`.
    ///
    /// With a projection, only the listed attributes need to be populated.
    async fn get_features(
        &self,
        type_name: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> BackendResult<FeatureReader>;
}

/// Cursor over an already materialised list of features
pub struct VecFeatureCursor {
    features: std::vec::IntoIter<Feature>,
    closed: bool,
}

impl VecFeatureCursor {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features: features.into_iter(),
            closed: false,
        }
    }

    pub fn boxed(features: Vec<Feature>) -> FeatureReader {
        Box::new(Self::new(features))
    }
}

#[async_trait]
impl FeatureCursor for VecFeatureCursor {
    async fn next(&mut self) -> BackendResult<Option<Feature>> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        Ok(self.features.next())
    }

    fn close(&mut self) -> BackendResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn vec_cursor_yields_then_closes() {
        let schema = Arc::new(Schema::new("T", vec![]));
        let mut cursor =
            VecFeatureCursor::new(vec![Feature::new("a", schema.clone()), Feature::new("b", schema)]);
        assert_eq!(cursor.next().await.unwrap().unwrap().id(), "a");
        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(matches!(cursor.next().await, Err(BackendError::Closed)));
    }
}
