//! Backend identifiers.
//!
//! Backends are addressed by an optional namespace and a name, written
//! `name` or `namespace:name`. The helpers here centralise the prefix
//! logic so configuration files, the CLI and the registry agree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Identifies a configured backend store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackendRef {
    namespace: Option<String>,
    name: String,
}

impl BackendRef {
    /// Reference without a namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Reference inside a namespace
    pub fn with_namespace(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Split `"namespace:name"` into `(Some("namespace"), "name")`.
///
/// Only the first `:` separates; a bare name yields `(None, name)`.
///
/// ```
/// # use geofed_core::backend_ref::split_namespace;
/// assert_eq!(split_namespace("gt:store3"), (Some("gt"), "store3"));
/// assert_eq!(split_namespace("store1"), (None, "store1"));
/// ```
pub fn split_namespace(id: &str) -> (Option<&str>, &str) {
    match id.find(':') {
        Some(idx) => (Some(&id[..idx]), &id[idx + 1..]),
        None => (None, id),
    }
}

impl FromStr for BackendRef {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = split_namespace(s.trim());
        if name.is_empty() {
            return Err(BackendError::InvalidRequest(format!(
                "Backend reference has an empty name: '{}'",
                s
            )));
        }
        match namespace {
            Some("") => Err(BackendError::InvalidRequest(format!(
                "Backend reference has an empty namespace: '{}'",
                s
            ))),
            Some(ns) => Ok(BackendRef::with_namespace(ns, name)),
            None => Ok(BackendRef::new(name)),
        }
    }
}

impl TryFrom<String> for BackendRef {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendRef> for String {
    fn from(value: BackendRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BackendRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}
