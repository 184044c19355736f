//! Error types for the aggregating store

use geofed_core::{BackendError, BackendRef, CrsError};
use thiserror::Error;

/// Result type for aggregate operations
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Errors surfaced by the aggregating store
#[derive(Debug, Error)]
pub enum AggregateError {
    /// A backend failed while the catalog was being built
    #[error("Configuration failed for backend '{backend}': {source}")]
    Configuration {
        backend: BackendRef,
        #[source]
        source: BackendError,
    },

    /// Configuration named a backend the registry does not hold
    #[error("Unknown backend: {0}")]
    UnknownBackend(BackendRef),

    /// Query issued before a successful configure (or after a reset)
    #[error("Aggregating store is not configured")]
    NotConfigured,

    /// Logical type not in the catalog
    #[error("Unknown feature type: {0}")]
    UnknownType(String),

    /// Projection named an attribute the canonical schema lacks
    #[error("Attribute '{attribute}' is not part of type '{type_name}'")]
    UnknownAttribute {
        type_name: String,
        attribute: String,
    },

    /// A backend failed during count / bounds / streaming
    #[error("Read from backend '{backend}' failed: {source}")]
    BackendRead {
        backend: BackendRef,
        #[source]
        source: BackendError,
    },

    /// Envelope reprojection failed while merging bounds
    #[error(transparent)]
    Crs(#[from] CrsError),
}

impl AggregateError {
    /// Backend responsible for the failure, if any
    pub fn backend(&self) -> Option<&BackendRef> {
        match self {
            AggregateError::Configuration { backend, .. }
            | AggregateError::BackendRead { backend, .. }
            | AggregateError::UnknownBackend(backend) => Some(backend),
            _ => None,
        }
    }
}

/// Lets an aggregate serve as a backend of another aggregate
impl From<AggregateError> for BackendError {
    fn from(e: AggregateError) -> Self {
        match e {
            AggregateError::UnknownType(name) => BackendError::TypeNotFound(name),
            AggregateError::UnknownAttribute {
                type_name,
                attribute,
            } => BackendError::AttributeNotFound {
                type_name,
                attribute,
            },
            AggregateError::BackendRead { backend, source } => match source {
                BackendError::Io(msg) => BackendError::Io(format!("{}: {}", backend, msg)),
                other => other,
            },
            AggregateError::Crs(e) => BackendError::Crs(e),
            AggregateError::NotConfigured => {
                BackendError::InvalidRequest("aggregate not configured".to_string())
            }
            other @ (AggregateError::Configuration { .. } | AggregateError::UnknownBackend(_)) => {
                BackendError::Internal(other.to_string())
            }
        }
    }
}
