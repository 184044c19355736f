//! Aggregate store configuration

use serde::{Deserialize, Serialize};

/// Tuning for an [`AggregatingStore`](crate::AggregatingStore)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Worker pool size: backend tasks allowed to run at once
    #[serde(default = "default_max_concurrent_backend_tasks")]
    pub max_concurrent_backend_tasks: usize,
    /// Fetch every native schema while building the catalog, so schema
    /// failures surface as configuration errors instead of at query time
    #[serde(default)]
    pub eager_schemas: bool,
}

fn default_max_concurrent_backend_tasks() -> usize {
    16
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            max_concurrent_backend_tasks: default_max_concurrent_backend_tasks(),
            eager_schemas: false,
        }
    }
}
