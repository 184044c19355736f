//! Command implementations for geofed

pub mod features;
pub mod scalar;
pub mod types;

pub use features::features;
pub use scalar::{bounds, count};
pub use types::{schema, types};

use anyhow::{Context, Result};
use geofed_core::Filter;

/// Parse the `--filter` JSON argument; `Include` when absent
pub fn parse_filter(raw: Option<&str>) -> Result<Filter> {
    match raw {
        Some(json) => serde_json::from_str(json).context("Invalid --filter JSON"),
        None => Ok(Filter::Include),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(None).unwrap(), Filter::Include);
        let filter = parse_filter(Some(
            r#"{"op":"compare","cmp":"equal","left":{"property":"NAME"},"right":{"literal":"Main Street"}}"#,
        ))
        .unwrap();
        assert_eq!(filter, Filter::equals("NAME", "Main Street"));
        assert!(parse_filter(Some("{not json")).is_err());
    }
}
