//! Query model

use serde::{Deserialize, Serialize};

use super::filter::Filter;

/// A read request against one logical feature type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Logical type name
    pub type_name: String,
    /// Row filter; `Include` when omitted
    #[serde(default)]
    pub filter: Filter,
    /// Explicit attribute projection; all attributes when `None`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub properties: Option<Vec<String>>,
}

impl Query {
    /// Everything of `type_name`
    pub fn all(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            filter: Filter::Include,
            properties: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Some(properties.into_iter().map(Into::into).collect());
        self
    }
}
