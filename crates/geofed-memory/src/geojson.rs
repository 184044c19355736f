//! GeoJSON FeatureCollection loading
//!
//! GeoJSON coordinates are WGS84 (RFC 7946). When the type configuration
//! declares no attributes, the schema is inferred: a `geometry` attribute
//! first, then properties in first-seen order typed by their first
//! non-null value (integers widen to float when both occur).

use std::collections::BTreeMap;
use std::path::Path;

use geofed_core::{
    AttributeDescriptor, BackendError, BackendResult, Crs, Geometry, Schema, Value, ValueType,
};
use serde::Deserialize;

/// Attribute name used for the feature geometry
pub const GEOMETRY_ATTRIBUTE: &str = "geometry";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A decoded row: feature id plus attribute values
pub type Row = (String, BTreeMap<String, Value>);

/// Parse a FeatureCollection. Features without an id get `<type>.<n>`.
pub fn parse_feature_collection(type_name: &str, json: &str) -> BackendResult<Vec<Row>> {
    let collection: FeatureCollection = serde_json::from_str(json)
        .map_err(|e| BackendError::InvalidRequest(format!("Invalid GeoJSON: {}", e)))?;

    let mut rows = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.into_iter().enumerate() {
        let id = match feature.id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => format!("{}.{}", type_name, idx + 1),
        };
        let mut values = BTreeMap::new();
        if let Some(geometry) = feature.geometry {
            values.insert(GEOMETRY_ATTRIBUTE.to_string(), Value::Geometry(geometry));
        }
        for (key, raw) in feature.properties.unwrap_or_default() {
            if let Some(value) = json_to_value(raw) {
                values.insert(key, value);
            }
        }
        rows.push((id, values));
    }
    Ok(rows)
}

/// Read and parse a FeatureCollection file
pub fn load_feature_collection(type_name: &str, path: &Path) -> BackendResult<Vec<Row>> {
    let content = std::fs::read_to_string(path)?;
    parse_feature_collection(type_name, &content)
}

fn json_to_value(raw: serde_json::Value) -> Option<Value> {
    match raw {
        serde_json::Value::Null => Some(Value::Null),
        serde_json::Value::Bool(b) => Some(Value::Bool(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        serde_json::Value::String(s) => Some(Value::Text(s)),
        // Nested objects/arrays have no attribute type here
        _ => None,
    }
}

/// Infer a schema from decoded rows.
///
/// Property order follows the `serde_json` map order of each feature,
/// which is alphabetical; the geometry attribute always comes first.
pub fn infer_schema(type_name: &str, rows: &[Row]) -> Schema {
    let mut attributes = vec![AttributeDescriptor::geometry(
        GEOMETRY_ATTRIBUTE,
        Crs::wgs84(),
    )];

    for (_, values) in rows {
        for (name, value) in values {
            if name == GEOMETRY_ATTRIBUTE {
                continue;
            }
            let inferred = match value {
                Value::Bool(_) => Some(ValueType::Boolean),
                Value::Integer(_) => Some(ValueType::Integer),
                Value::Float(_) => Some(ValueType::Float),
                Value::Text(_) => Some(ValueType::String),
                Value::Null | Value::Geometry(_) => None,
            };
            match attributes.iter_mut().find(|a| &a.name == name) {
                Some(existing) => {
                    if existing.value_type == ValueType::Integer
                        && inferred == Some(ValueType::Float)
                    {
                        existing.value_type = ValueType::Float;
                    }
                }
                None => {
                    if let Some(value_type) = inferred {
                        attributes.push(AttributeDescriptor::new(name.clone(), value_type));
                    }
                }
            }
        }
    }

    Schema::new(type_name, attributes)
}
