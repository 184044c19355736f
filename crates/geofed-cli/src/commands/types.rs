//! Catalog commands - list types, show a schema

use anyhow::Result;
use geofed_aggregate::AggregatingStore;

use crate::output::{AttributeRow, OutputContext, TypeRow};

/// List logical types with the backends contributing to each
pub async fn types(store: &AggregatingStore, ctx: &OutputContext) -> Result<()> {
    let mut rows = Vec::new();
    for name in store.get_type_names()? {
        let config = store.get_type_configuration(&name)?;
        let backends: Vec<String> = config
            .store_map()
            .map(|(backend, native)| format!("{}:{}", backend, native))
            .collect();
        rows.push(TypeRow {
            name,
            backends: backends.join(", "),
        });
    }
    ctx.print(&rows)
}

/// Show the canonical schema of a type
pub async fn schema(store: &AggregatingStore, type_name: &str, ctx: &OutputContext) -> Result<()> {
    let schema = store.get_schema(type_name).await?;
    let rows: Vec<AttributeRow> = schema
        .attributes
        .iter()
        .map(|a| AttributeRow {
            name: a.name.clone(),
            value_type: a.value_type.to_string(),
            nullable: a.nullable,
            crs: a.crs.as_ref().map(ToString::to_string).unwrap_or_default(),
        })
        .collect();
    ctx.print(&rows)
}
