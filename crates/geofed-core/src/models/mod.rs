//! Shared data models for feature backends

mod feature;
mod filter;
mod geometry;
mod query;
mod schema;
mod value;

pub use feature::*;
pub use filter::*;
pub use geometry::*;
pub use query::*;
pub use schema::*;
pub use value::*;
