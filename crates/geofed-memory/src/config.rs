//! Memory backend configuration
//!
//! Backends are described by serde structs so they can be declared inline
//! in a TOML/JSON config file, or point at GeoJSON files on disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use geofed_core::{AttributeDescriptor, BackendRef, Value};
use serde::{Deserialize, Serialize};

/// Configuration for one memory backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBackendConfig {
    /// Backend name, unique within its namespace
    pub name: String,
    /// Optional namespace (`namespace:name`)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub namespace: Option<String>,
    /// Artificial latency added to every call (milliseconds)
    #[serde(default)]
    pub latency_ms: u64,
    /// Feature types, in advertised order
    #[serde(default, rename = "type")]
    pub types: Vec<MemoryTypeConfig>,
}

impl MemoryBackendConfig {
    pub fn backend_ref(&self) -> BackendRef {
        match &self.namespace {
            Some(ns) => BackendRef::with_namespace(ns, &self.name),
            None => BackendRef::new(&self.name),
        }
    }
}

/// One feature type of a memory backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTypeConfig {
    /// Native type name
    pub name: String,
    /// Attribute descriptors; inferred from the GeoJSON file when empty
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
    /// Inline features
    #[serde(default, rename = "feature")]
    pub features: Vec<FeatureConfig>,
    /// GeoJSON FeatureCollection to load features from
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub geojson: Option<PathBuf>,
}

/// An inline feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub id: String,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_backend() {
        let cfg: MemoryBackendConfig = toml::from_str(
            r#"
            name = "store3"
            namespace = "gt"

            [[type]]
            name = "RoadSegments"
            attributes = [
                { name = "the_geom", type = "geometry", crs = "EPSG:4326" },
                { name = "ID", type = "string" },
            ]

            [[type.feature]]
            id = "rs.1"
            values = { ID = "r1", the_geom = { type = "LineString", coordinates = [[0.0, 0.0], [1.0, 1.0]] } }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.backend_ref().to_string(), "gt:store3");
        assert_eq!(cfg.latency_ms, 0);
        assert_eq!(cfg.types.len(), 1);
        assert!(cfg.types[0].attributes[0].is_geometry());
        assert_eq!(cfg.types[0].features[0].values.len(), 2);
    }
}
