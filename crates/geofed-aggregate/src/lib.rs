//! geofed-aggregate - Federated feature store over heterogeneous backends
//!
//! This crate provides the [`AggregatingStore`], which exposes several
//! independent feature backends as one logical, read-only store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       AggregatingStore                           │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │                Catalog (Arc snapshot)                     │  │
//! │  │  - Type names in first-seen order                         │  │
//! │  │  - TypeConfiguration per logical type                     │  │
//! │  │    (backend -> native name, first entry = canonical)      │  │
//! │  └───────────────────────────┬──────────────────────────────┘  │
//! │                              │                                  │
//! │                  FederatedFeatureSource                          │
//! │          count / bounds / features over the WorkerPool           │
//! │                              │                                  │
//! │              ┌───────────────┼───────────────┐                  │
//! │              ▼               ▼               ▼                  │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐      │
//! │  │ MemoryBackend │  │ MemoryBackend │  │AggregatingStore│     │
//! │  │   (store1)    │  │   (store2)    │  │   (nested)    │      │
//! │  └───────────────┘  └───────────────┘  └───────────────┘      │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use geofed_aggregate::{AggregateConfig, AggregatingStore, BackendRegistry};
//!
//! let mut registry = BackendRegistry::new();
//! registry.register(BackendRef::new("store1"), Arc::new(store1));
//! registry.register(BackendRef::new("store2"), Arc::new(store2));
//!
//! let store = AggregatingStore::new(Arc::new(registry), AggregateConfig::default());
//! store.auto_configure_stores(&[BackendRef::new("store1"), BackendRef::new("store2")]).await?;
//!
//! let roads = store.get_feature_source("RoadSegments")?;
//! let n = roads.count(&Filter::equals("NAME", "Main Street")).await?;
//! ```

mod catalog;
mod config;
mod error;
mod pool;
mod reader;
mod registry;
mod source;
mod store;
mod type_config;

#[cfg(test)]
mod test_support;

pub use catalog::Catalog;
pub use config::AggregateConfig;
pub use error::{AggregateError, AggregateResult};
pub use pool::WorkerPool;
pub use reader::{FederatedFeatureCollection, FederatedFeatureReader};
pub use registry::BackendRegistry;
pub use source::FederatedFeatureSource;
pub use store::AggregatingStore;
pub use type_config::TypeConfiguration;

// Re-export core types for convenience
pub use geofed_core::{BackendError, BackendRef, BackendResult, FeatureBackend};
