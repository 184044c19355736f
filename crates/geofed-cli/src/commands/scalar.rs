//! Count and bounds commands

use anyhow::Result;
use geofed_aggregate::AggregatingStore;
use serde_json::json;

use super::parse_filter;
use crate::output::OutputContext;

/// Count features of a type
pub async fn count(
    store: &AggregatingStore,
    type_name: &str,
    filter: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let filter = parse_filter(filter)?;
    let count = store.get_feature_source(type_name)?.count(&filter).await?;
    ctx.print_value(&json!({ "type": type_name, "count": count }))
}

/// Bounds of a type's features
pub async fn bounds(
    store: &AggregatingStore,
    type_name: &str,
    filter: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let filter = parse_filter(filter)?;
    let bounds = store.get_feature_source(type_name)?.bounds(&filter).await?;
    ctx.print_value(&json!({ "type": type_name, "bounds": bounds }))
}
