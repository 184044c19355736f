//! Filter expressions
//!
//! A small predicate language: comparisons over property references,
//! literals and a handful of functions, combined with boolean operators.
//! Filters can report the attribute names they reference, which the
//! federation layer uses to decide where a filter may be pushed down.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::feature::Feature;
use super::geometry::Envelope;
use super::value::Value;

/// A value-producing expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Attribute of the evaluated feature
    Property(String),
    /// Constant
    Literal(Value),
    /// Character length of a text value
    StrLength(Box<Expression>),
}

impl Expression {
    pub fn property(name: impl Into<String>) -> Self {
        Expression::Property(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn str_length(inner: Expression) -> Self {
        Expression::StrLength(Box::new(inner))
    }

    /// Evaluate against a feature; absent attributes evaluate to `Null`
    pub fn evaluate(&self, feature: &Feature) -> Value {
        match self {
            Expression::Property(name) => feature.get(name).cloned().unwrap_or(Value::Null),
            Expression::Literal(v) => v.clone(),
            Expression::StrLength(inner) => match inner.evaluate(feature) {
                Value::Text(s) => Value::Integer(s.chars().count() as i64),
                _ => Value::Null,
            },
        }
    }

    fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        match self {
            Expression::Property(name) => {
                out.insert(name.clone());
            }
            Expression::Literal(_) => {}
            Expression::StrLength(inner) => inner.collect_attributes(out),
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareOp {
    fn test(self, left: &Value, right: &Value) -> bool {
        if left.is_null() || right.is_null() {
            return false;
        }
        match self {
            CompareOp::Equal => left.loosely_equals(right),
            CompareOp::NotEqual => !left.loosely_equals(right),
            CompareOp::Less => left.compare(right) == Some(Ordering::Less),
            CompareOp::LessOrEqual => matches!(
                left.compare(right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Greater => left.compare(right) == Some(Ordering::Greater),
            CompareOp::GreaterOrEqual => matches!(
                left.compare(right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Boolean predicate over a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// Matches everything
    #[default]
    Include,
    /// Matches nothing
    Exclude,
    Compare {
        #[serde(rename = "cmp")]
        op: CompareOp,
        left: Expression,
        right: Expression,
    },
    IsNull {
        expr: Expression,
    },
    /// Geometry bounds intersect the envelope. Without a property the
    /// feature's default geometry is used.
    #[serde(rename = "bbox")]
    BBox {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        property: Option<String>,
        envelope: Envelope,
    },
    And {
        filters: Vec<Filter>,
    },
    Or {
        filters: Vec<Filter>,
    },
    Not {
        filter: Box<Filter>,
    },
}

impl Filter {
    pub fn compare(op: CompareOp, left: Expression, right: Expression) -> Self {
        Filter::Compare { op, left, right }
    }

    /// `property = literal`
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::compare(
            CompareOp::Equal,
            Expression::property(property),
            Expression::literal(value),
        )
    }

    /// `left > literal`
    pub fn greater(left: Expression, value: impl Into<Value>) -> Self {
        Filter::compare(CompareOp::Greater, left, Expression::literal(value))
    }

    pub fn bbox(envelope: Envelope) -> Self {
        Filter::BBox {
            property: None,
            envelope,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Filter::Include)
    }

    pub fn is_exclude(&self) -> bool {
        matches!(self, Filter::Exclude)
    }

    /// Names of all attributes the filter reads.
    ///
    /// A bbox without an explicit property reads the default geometry and
    /// references no attribute name.
    pub fn referenced_attributes(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        match self {
            Filter::Include | Filter::Exclude => {}
            Filter::Compare { left, right, .. } => {
                left.collect_attributes(out);
                right.collect_attributes(out);
            }
            Filter::IsNull { expr } => expr.collect_attributes(out),
            Filter::BBox { property, .. } => {
                if let Some(p) = property {
                    out.insert(p.clone());
                }
            }
            Filter::And { filters } | Filter::Or { filters } => {
                for f in filters {
                    f.collect_attributes(out);
                }
            }
            Filter::Not { filter } => filter.collect_attributes(out),
        }
    }

    /// Evaluate against a feature
    pub fn evaluate(&self, feature: &Feature) -> bool {
        match self {
            Filter::Include => true,
            Filter::Exclude => false,
            Filter::Compare { op, left, right } => {
                op.test(&left.evaluate(feature), &right.evaluate(feature))
            }
            Filter::IsNull { expr } => expr.evaluate(feature).is_null(),
            Filter::BBox { property, envelope } => bbox_matches(feature, property, envelope),
            Filter::And { filters } => filters.iter().all(|f| f.evaluate(feature)),
            Filter::Or { filters } => filters.iter().any(|f| f.evaluate(feature)),
            Filter::Not { filter } => !filter.evaluate(feature),
        }
    }
}

fn bbox_matches(feature: &Feature, property: &Option<String>, envelope: &Envelope) -> bool {
    let schema = feature.schema();
    let attr = match property {
        Some(name) => schema.attribute(name),
        None => schema.default_geometry(),
    };
    let Some(attr) = attr else {
        return false;
    };
    let (Some(crs), Some(geom)) = (
        attr.crs.as_ref(),
        feature.get(&attr.name).and_then(Value::as_geometry),
    ) else {
        return false;
    };
    let Some(bounds) = geom.envelope(crs) else {
        return false;
    };
    match envelope.reproject(crs) {
        Ok(query) => query.intersects(&bounds),
        Err(_) => false,
    }
}
