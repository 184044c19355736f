//! Configuration file handling for geofed

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use geofed_aggregate::{AggregateConfig, BackendRegistry};
use geofed_core::{BackendRef, FeatureBackend};
use geofed_memory::{MemoryBackend, MemoryBackendConfig};
use serde::{Deserialize, Serialize};

/// Contents of the TOML configuration file
///
/// ```toml
/// order = ["store1", "gt:store3"]
///
/// [aggregate]
/// max_concurrent_backend_tasks = 8
///
/// [[backend]]
/// name = "store1"
///
/// [[backend.type]]
/// name = "BasicPolygons"
/// geojson = "polygons.geojson"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend order for configuration; every backend in file order when empty
    #[serde(default)]
    pub order: Vec<BackendRef>,
    #[serde(default)]
    pub aggregate: AggregateConfig,
    #[serde(default, rename = "backend")]
    pub backends: Vec<MemoryBackendConfig>,
}

impl Config {
    /// Load configuration from a specific path.
    ///
    /// Relative GeoJSON paths are resolved against the file's directory.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        for backend in &mut config.backends {
            for ty in &mut backend.types {
                if let Some(file) = &ty.geojson {
                    if file.is_relative() {
                        ty.geojson = Some(base.join(file));
                    }
                }
            }
        }
        Ok(config)
    }

    /// Backend order: `--order` wins, then the file's `order`, then file order
    pub fn resolve_order(&self, overridden: &[BackendRef]) -> Vec<BackendRef> {
        if !overridden.is_empty() {
            overridden.to_vec()
        } else if !self.order.is_empty() {
            self.order.clone()
        } else {
            self.backends.iter().map(|b| b.backend_ref()).collect()
        }
    }

    /// Instantiate every configured backend
    pub fn build_registry(&self) -> Result<BackendRegistry> {
        let mut registry = BackendRegistry::new();
        for backend_config in &self.backends {
            let backend_ref = backend_config.backend_ref();
            if registry.get(&backend_ref).is_some() {
                bail!("Backend '{}' is configured twice", backend_ref);
            }
            let backend = MemoryBackend::from_config(backend_config)
                .with_context(|| format!("Failed to create backend '{}'", backend_ref))?;
            registry.register(backend_ref, Arc::new(backend) as Arc<dyn FeatureBackend>);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::*;

    const CONFIG: &str = r#"
order = ["gt:store3", "store1"]

[aggregate]
max_concurrent_backend_tasks = 4

[[backend]]
name = "store1"

[[backend.type]]
name = "BasicPolygons"
geojson = "polygons.geojson"

[[backend]]
name = "store3"
namespace = "gt"

[[backend.type]]
name = "RoadSegments"
attributes = [{ name = "ID", type = "string" }]

[[backend.type.feature]]
id = "rs.1"
values = { ID = "r1" }
"#;

    const POLYGONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "id": "p1",
              "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
              "properties": { "ID": "one" } }
        ]
    }"#;

    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("geofed.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(CONFIG.as_bytes())
            .unwrap();
        std::fs::write(dir.join("polygons.geojson"), POLYGONS).unwrap();
        path
    }

    #[test]
    fn test_load_resolves_relative_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&write_config(dir.path())).unwrap();

        assert_eq!(config.aggregate.max_concurrent_backend_tasks, 4);
        assert!(!config.aggregate.eager_schemas);
        assert_eq!(
            config.backends[0].types[0].geojson.as_deref(),
            Some(dir.path().join("polygons.geojson").as_path())
        );
    }

    #[test]
    fn test_order_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&write_config(dir.path())).unwrap();

        let from_file: Vec<_> = config.resolve_order(&[]).iter().map(ToString::to_string).collect();
        assert_eq!(from_file, vec!["gt:store3", "store1"]);

        let overridden = config.resolve_order(&[BackendRef::new("store1")]);
        assert_eq!(overridden, vec![BackendRef::new("store1")]);

        let unordered = Config {
            order: Vec::new(),
            ..config
        };
        let file_order: Vec<_> = unordered.resolve_order(&[]).iter().map(ToString::to_string).collect();
        assert_eq!(file_order, vec!["store1", "gt:store3"]);
    }

    #[test]
    fn test_build_registry() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&write_config(dir.path())).unwrap();
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&BackendRef::with_namespace("gt", "store3")).is_some());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = Config::load_from(Path::new("/nonexistent/geofed.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
