//! geofed-memory - In-memory feature backend
//!
//! Provides [`MemoryBackend`], a [`FeatureBackend`] keeping feature types
//! in process memory, declared programmatically, through serde config, or
//! loaded from GeoJSON FeatureCollections.

pub mod backend;
pub mod config;
pub mod geojson;

pub use backend::{CursorStats, MemoryBackend};
pub use config::{FeatureConfig, MemoryBackendConfig, MemoryTypeConfig};

// Re-export core types for convenience
pub use geofed_core::{BackendError, BackendRef, BackendResult, FeatureBackend};
