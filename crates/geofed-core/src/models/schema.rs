//! Feature type schemas

use serde::{Deserialize, Serialize};

use super::geometry::Crs;

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Geometry,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Geometry => "geometry",
        };
        f.write_str(name)
    }
}

/// Describes one attribute of a feature type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Attribute name
    pub name: String,
    /// Value type
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Whether null / absent values are allowed
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Reference system, geometry attributes only
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub crs: Option<Crs>,
}

fn default_nullable() -> bool {
    true
}

impl AttributeDescriptor {
    /// Non-geometry attribute
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            nullable: true,
            crs: None,
        }
    }

    /// Geometry attribute in the given reference system
    pub fn geometry(name: impl Into<String>, crs: Crs) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Geometry,
            nullable: true,
            crs: Some(crs),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn is_geometry(&self) -> bool {
        self.value_type == ValueType::Geometry
    }
}

/// Ordered attribute descriptors of a feature type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Type name this schema describes
    pub type_name: String,
    /// Attributes in declaration order
    pub attributes: Vec<AttributeDescriptor>,
}

impl Schema {
    pub fn new(type_name: impl Into<String>, attributes: Vec<AttributeDescriptor>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// First geometry attribute
    pub fn default_geometry(&self) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.is_geometry())
    }

    /// Copy of this schema restricted to `names`, keeping declaration order
    pub fn retain(&self, names: &[String]) -> Schema {
        Schema {
            type_name: self.type_name.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|a| names.iter().any(|n| n == &a.name))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygons() -> Schema {
        Schema::new(
            "BasicPolygons",
            vec![
                AttributeDescriptor::geometry("the_geom", Crs::wgs84()),
                AttributeDescriptor::new("ID", ValueType::String),
            ],
        )
    }

    #[test]
    fn default_geometry_is_first_geometry_attribute() {
        assert_eq!(polygons().default_geometry().unwrap().name, "the_geom");
    }

    #[test]
    fn retain_keeps_declaration_order() {
        let s = polygons().retain(&["ID".to_string(), "the_geom".to_string()]);
        let names: Vec<_> = s.attribute_names().collect();
        assert_eq!(names, vec!["the_geom", "ID"]);
    }

    #[test]
    fn descriptor_serde_defaults() {
        let d: AttributeDescriptor =
            serde_json::from_str(r#"{"name":"NAME","type":"string"}"#).unwrap();
        assert!(d.nullable);
        assert!(!d.is_geometry());
    }
}
