//! Feature records

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::geometry::{Envelope, Geometry};
use super::schema::Schema;
use super::value::Value;

/// A feature: identifier, owning schema and attribute values.
///
/// Attributes not declared by the schema are never stored; declared
/// attributes may be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    id: String,
    #[serde(skip)]
    schema: Arc<Schema>,
    attributes: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(id: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            id: id.into(),
            schema,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute; names the schema does not declare are ignored
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        if self.schema.has_attribute(&name) {
            self.attributes.insert(name, value.into());
        }
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Value of the schema's default geometry attribute
    pub fn default_geometry(&self) -> Option<&Geometry> {
        let attr = self.schema.default_geometry()?;
        self.attributes.get(&attr.name)?.as_geometry()
    }

    /// Bounds of the default geometry, in the geometry attribute's CRS
    pub fn bounds(&self) -> Option<Envelope> {
        let attr = self.schema.default_geometry()?;
        let crs = attr.crs.as_ref()?;
        self.default_geometry()?.envelope(crs)
    }

    /// Rebuild this feature under `target`.
    ///
    /// Attributes are matched by name. Those `target` does not declare are
    /// dropped; those this feature lacks stay absent.
    pub fn retype(self, target: &Arc<Schema>) -> Feature {
        let mut attributes = self.attributes;
        attributes.retain(|name, _| target.has_attribute(name));
        Feature {
            id: self.id,
            schema: Arc::clone(target),
            attributes,
        }
    }
}
