//! Fixtures for unit tests

use std::sync::Arc;

use geofed_core::{
    AttributeDescriptor, BackendRef, Crs, Feature, FeatureBackend, Geometry, Schema, ValueType,
};
use geofed_memory::MemoryBackend;

use crate::{AggregateConfig, AggregatingStore, BackendRegistry};

/// `Parcels` with geometry, `ID` and `OWNER`
pub fn parcels_schema(with_owner: bool) -> Schema {
    let mut attributes = vec![
        AttributeDescriptor::geometry("geom", Crs::wgs84()),
        AttributeDescriptor::new("ID", ValueType::String),
    ];
    if with_owner {
        attributes.push(AttributeDescriptor::new("OWNER", ValueType::String));
    }
    Schema::new("Parcels", attributes)
}

/// Backend holding `Parcels` rows `(id, owner, x)`, each a unit square at `x,0`
pub fn parcels(name: &str, with_owner: bool, rows: &[(&str, &str, f64)]) -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new(BackendRef::new(name));
    let schema = backend.add_type(parcels_schema(with_owner));
    for (id, owner, x) in rows {
        let mut feature = Feature::new(*id, Arc::clone(&schema))
            .with("geom", Geometry::rectangle(*x, 0.0, x + 1.0, 1.0))
            .with("ID", *id);
        if with_owner {
            feature.set("OWNER", *owner);
        }
        backend
            .add_feature("Parcels", feature)
            .expect("Parcels registered");
    }
    Arc::new(backend)
}

/// `east` (with OWNER, 2 rows) and `west` (no OWNER, 1 row), registered
pub fn two_backends() -> (Arc<MemoryBackend>, Arc<MemoryBackend>, AggregatingStore) {
    let east = parcels("east", true, &[("e1", "ann", 0.0), ("e2", "bob", 2.0)]);
    let west = parcels("west", false, &[("w1", "", -3.0)]);
    let store = store_over(&[&east, &west], AggregateConfig::default());
    (east, west, store)
}

pub fn store_over(backends: &[&Arc<MemoryBackend>], config: AggregateConfig) -> AggregatingStore {
    let mut registry = BackendRegistry::new();
    for b in backends {
        registry.register(
            b.backend_ref().clone(),
            Arc::clone(*b) as Arc<dyn FeatureBackend>,
        );
    }
    AggregatingStore::new(Arc::new(registry), config)
}

pub fn refs(names: &[&str]) -> Vec<BackendRef> {
    names.iter().map(|n| BackendRef::new(*n)).collect()
}
