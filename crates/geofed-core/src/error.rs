//! Common error types for feature backends

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur in feature backends
#[derive(Debug, Error)]
pub enum BackendError {
    /// Feature type not advertised by this backend
    #[error("Feature type not found: {0}")]
    TypeNotFound(String),

    /// Attribute not present in the native schema
    #[error("Attribute '{attribute}' not found in type '{type_name}'")]
    AttributeNotFound {
        /// Native type name
        type_name: String,
        /// Missing attribute
        attribute: String,
    },

    /// I/O failure while talking to the underlying store
    #[error("I/O error: {0}")]
    Io(String),

    /// Coordinate reference system problem
    #[error(transparent)]
    Crs(#[from] CrsError),

    /// Cursor used after it was closed
    #[error("Cursor closed")]
    Closed,

    /// Invalid parameter or request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Operation not supported by this backend
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Io(_))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError::Io(e.to_string())
    }
}

/// Reprojection / CRS compatibility errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    /// No transform known between the two reference systems
    #[error("No transform from {from} to {to}")]
    UnsupportedTransform {
        /// Source CRS code
        from: String,
        /// Target CRS code
        to: String,
    },

    /// Envelopes in different reference systems cannot be combined directly
    #[error("CRS mismatch: {left} vs {right}")]
    Mismatch {
        /// CRS of the receiving envelope
        left: String,
        /// CRS of the other envelope
        right: String,
    },
}
