//! Features command - stream a type's features

use anyhow::Result;
use futures::StreamExt;
use geofed_aggregate::AggregatingStore;
use geofed_core::Query;

use super::parse_filter;
use crate::output::{FeatureRow, OutputContext, OutputFormat};

/// Print features of a type, optionally filtered, projected and limited
pub async fn features(
    store: &AggregatingStore,
    type_name: &str,
    filter: Option<&str>,
    properties: &[String],
    limit: Option<usize>,
    ctx: &OutputContext,
) -> Result<()> {
    let mut query = Query::all(type_name).with_filter(parse_filter(filter)?);
    if !properties.is_empty() {
        query = query.with_properties(properties.iter().cloned());
    }

    let collection = store.get_feature_source(type_name)?.features(query).await?;
    let stream = collection.reader().await?.into_stream();
    let mut stream = Box::pin(stream.take(limit.unwrap_or(usize::MAX)));

    let mut features = Vec::new();
    while let Some(feature) = stream.next().await {
        features.push(feature?);
    }

    match ctx.format {
        OutputFormat::Json => ctx.print_value(&features),
        OutputFormat::Table => {
            let rows = features
                .iter()
                .map(|f| -> Result<FeatureRow> {
                    Ok(FeatureRow {
                        id: f.id().to_string(),
                        attributes: serde_json::to_string(f.attributes())?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            ctx.print(&rows)
        }
    }
}
