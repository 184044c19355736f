//! Integration tests for geofed
//!
//! End-to-end tests over the full stack: memory backends, the backend
//! registry and the aggregating store.
//!
//! # Fixture
//!
//! Three backends modelled on a classic federation setup:
//!
//! | backend     | BasicPolygons                  | RoadSegments          | Streams |
//! |-------------|--------------------------------|-----------------------|---------|
//! | `store1`    | one, two, three (`ID`)         | 3 roads (`ID`,`NAME`) | -       |
//! | `store2`    | four (`ID`,`DESCRIPTION`)      | -                     | 2       |
//! | `gt:store3` | -                              | 2 roads (`ID` only)   | -       |
//!
//! # Test Structure
//!
//! - `catalog_test.rs` - type listing, canonical schemas, lifecycle
//! - `query_test.rs` - counts, bounds, filter routing, failures
//! - `stream_test.rs` - merged readers, cursor release, nesting

use std::sync::Arc;

use geofed_aggregate::{AggregateConfig, AggregatingStore, BackendRegistry};
use geofed_core::{
    AttributeDescriptor, BackendRef, Crs, Feature, FeatureBackend, Geometry, Schema, ValueType,
};
use geofed_memory::MemoryBackend;

pub const BASIC_POLYGONS: &str = "BasicPolygons";
pub const ROAD_SEGMENTS: &str = "RoadSegments";
pub const STREAMS: &str = "Streams";

/// The three fixture backends, registered in one registry
pub struct Fixture {
    pub store1: Arc<MemoryBackend>,
    pub store2: Arc<MemoryBackend>,
    pub store3: Arc<MemoryBackend>,
    pub registry: Arc<BackendRegistry>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let store1 = Arc::new(store1());
        let store2 = Arc::new(store2());
        let store3 = Arc::new(store3());

        let mut registry = BackendRegistry::new();
        for backend in [&store1, &store2, &store3] {
            registry.register(
                backend.backend_ref().clone(),
                Arc::clone(backend) as Arc<dyn FeatureBackend>,
            );
        }

        Self {
            store1,
            store2,
            store3,
            registry: Arc::new(registry),
        }
    }

    /// A fresh, unconfigured store over the fixture registry
    pub fn store(&self) -> AggregatingStore {
        self.store_with(AggregateConfig::default())
    }

    pub fn store_with(&self, config: AggregateConfig) -> AggregatingStore {
        AggregatingStore::new(Arc::clone(&self.registry), config)
    }

    /// A store configured over `order`
    pub async fn configured(&self, order: &[&str]) -> AggregatingStore {
        let store = self.store();
        store
            .auto_configure_stores(&refs(order))
            .await
            .expect("fixture configuration");
        store
    }

    pub fn backends(&self) -> [&Arc<MemoryBackend>; 3] {
        [&self.store1, &self.store2, &self.store3]
    }

    /// Cursors opened across all backends
    pub fn cursors_opened(&self) -> usize {
        self.backends().iter().map(|b| b.stats().opened()).sum()
    }

    /// Panics unless every opened cursor was closed explicitly
    pub fn assert_all_cursors_closed(&self) {
        for backend in self.backends() {
            let stats = backend.stats();
            assert_eq!(
                stats.opened(),
                stats.closed(),
                "cursor leak on {}",
                backend.backend_ref()
            );
            assert_eq!(stats.leaked(), 0, "cursor dropped unclosed on {}", backend.backend_ref());
        }
    }
}

/// Parse `["store1", "gt:store3"]` into references
pub fn refs(names: &[&str]) -> Vec<BackendRef> {
    names
        .iter()
        .map(|n| n.parse().expect("valid backend reference"))
        .collect()
}

pub fn polygons_schema(with_description: bool) -> Schema {
    let mut attributes = vec![
        AttributeDescriptor::geometry("the_geom", Crs::wgs84()),
        AttributeDescriptor::new("ID", ValueType::String),
    ];
    if with_description {
        attributes.push(AttributeDescriptor::new("DESCRIPTION", ValueType::String));
    }
    Schema::new(BASIC_POLYGONS, attributes)
}

pub fn roads_schema(with_name: bool) -> Schema {
    let mut attributes = vec![
        AttributeDescriptor::geometry("the_geom", Crs::wgs84()),
        AttributeDescriptor::new("ID", ValueType::String),
    ];
    if with_name {
        attributes.push(AttributeDescriptor::new("NAME", ValueType::String));
    }
    Schema::new(ROAD_SEGMENTS, attributes)
}

pub fn streams_schema() -> Schema {
    Schema::new(
        STREAMS,
        vec![
            AttributeDescriptor::geometry("the_geom", Crs::wgs84()),
            AttributeDescriptor::new("ID", ValueType::String),
            AttributeDescriptor::new("NAME", ValueType::String),
        ],
    )
}

fn polygon(schema: &Arc<Schema>, id: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Feature {
    Feature::new(format!("{}.{}", BASIC_POLYGONS, id), Arc::clone(schema))
        .with("the_geom", Geometry::rectangle(min_x, min_y, max_x, max_y))
        .with("ID", id)
}

fn line(schema: &Arc<Schema>, id: &str, coords: [[f64; 2]; 2]) -> Feature {
    Feature::new(format!("{}.{}", schema.type_name, id), Arc::clone(schema))
        .with("the_geom", Geometry::LineString(coords.to_vec()))
        .with("ID", id)
}

fn add(backend: &MemoryBackend, feature: Feature) {
    let type_name = feature.schema().type_name.clone();
    backend
        .add_feature(&type_name, feature)
        .expect("fixture type registered");
}

fn store1() -> MemoryBackend {
    let backend = MemoryBackend::new(BackendRef::new("store1"));

    let polygons = backend.add_type(polygons_schema(false));
    add(&backend, polygon(&polygons, "one", 0.0, -1.0, 2.0, 1.0));
    add(&backend, polygon(&polygons, "two", -2.0, 3.0, 1.0, 6.0));
    add(&backend, polygon(&polygons, "three", -1.0, 0.0, 1.0, 2.0));

    let roads = backend.add_type(roads_schema(true));
    for (id, name, coords) in [
        ("r1", "Main Street", [[0.0, 0.0], [1.0, 0.0]]),
        ("r2", "Dirt Road", [[1.0, 0.0], [1.0, 1.0]]),
        ("r3", "Route 5", [[1.0, 1.0], [2.0, 2.0]]),
    ] {
        add(&backend, line(&roads, id, coords).with("NAME", name));
    }
    backend
}

fn store2() -> MemoryBackend {
    let backend = MemoryBackend::new(BackendRef::new("store2"));

    let polygons = backend.add_type(polygons_schema(true));
    add(
        &backend,
        polygon(&polygons, "four", 2.0, 2.0, 4.0, 4.0).with("DESCRIPTION", "square"),
    );

    let streams = backend.add_type(streams_schema());
    add(&backend, line(&streams, "s1", [[0.0, 5.0], [3.0, 5.0]]).with("NAME", "Cam Stream"));
    add(&backend, line(&streams, "s2", [[3.0, 5.0], [3.0, 8.0]]).with("NAME", "Mill Race"));
    backend
}

fn store3() -> MemoryBackend {
    let backend = MemoryBackend::new(BackendRef::with_namespace("gt", "store3"));

    let roads = backend.add_type(roads_schema(false));
    add(&backend, line(&roads, "r4", [[5.0, 5.0], [6.0, 5.0]]));
    add(&backend, line(&roads, "r5", [[6.0, 5.0], [6.0, 7.0]]));
    backend
}
