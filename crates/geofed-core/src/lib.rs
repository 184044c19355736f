//! geofed-core - Core traits and types for federated feature stores
//!
//! This crate provides the fundamental abstractions that allow different
//! feature stores (in-memory, file-backed, nested aggregates) to be served
//! behind one federated read path.

pub mod backend;
pub mod backend_ref;
pub mod error;
pub mod models;

pub use backend::{FeatureBackend, FeatureCursor, FeatureReader, VecFeatureCursor};
pub use backend_ref::BackendRef;
pub use error::{BackendError, BackendResult, CrsError};
pub use models::*;
