//! geofed - Command-line front end for the aggregating feature store
//!
//! Builds the backends described in a TOML file, configures an
//! aggregating store over them and answers catalog and read queries.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geofed_aggregate::AggregatingStore;
use geofed_core::BackendRef;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "geofed")]
#[command(author, version, about = "Federated geospatial feature store")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GEOFED_CONFIG", default_value = "geofed.toml")]
    config: PathBuf,

    /// Backend order, overriding the configured one (e.g. store1,gt:store3)
    #[arg(long, value_delimiter = ',')]
    order: Vec<BackendRef>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List logical feature types
    Types,

    /// Show the canonical schema of a type
    Schema {
        /// Logical type name
        type_name: String,
    },

    /// Count features
    Count {
        /// Logical type name
        type_name: String,

        /// Filter as JSON
        #[arg(long)]
        filter: Option<String>,
    },

    /// Compute feature bounds
    Bounds {
        /// Logical type name
        type_name: String,

        /// Filter as JSON
        #[arg(long)]
        filter: Option<String>,
    },

    /// Print features
    Features {
        /// Logical type name
        type_name: String,

        /// Filter as JSON
        #[arg(long)]
        filter: Option<String>,

        /// Attributes to return (comma separated)
        #[arg(long, value_delimiter = ',')]
        properties: Vec<String>,

        /// Stop after this many features
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable
    let default_filter = if cli.verbose {
        "geofed=debug,geofed_aggregate=debug,geofed_memory=debug"
    } else {
        "geofed=info,geofed_aggregate=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load_from(&cli.config)?;
    let registry = config.build_registry()?;
    let order = config.resolve_order(&cli.order);
    info!(config = %cli.config.display(), backends = registry.len(), "Loaded configuration");

    let store = AggregatingStore::new(Arc::new(registry), config.aggregate.clone());
    store
        .auto_configure_stores(&order)
        .await
        .context("Failed to configure aggregating store")?;

    let ctx = OutputContext::new(cli.output);

    match &cli.command {
        Commands::Types => commands::types(&store, &ctx).await?,

        Commands::Schema { type_name } => commands::schema(&store, type_name, &ctx).await?,

        Commands::Count { type_name, filter } => {
            commands::count(&store, type_name, filter.as_deref(), &ctx).await?
        }

        Commands::Bounds { type_name, filter } => {
            commands::bounds(&store, type_name, filter.as_deref(), &ctx).await?
        }

        Commands::Features {
            type_name,
            filter,
            properties,
            limit,
        } => {
            commands::features(
                &store,
                type_name,
                filter.as_deref(),
                properties,
                *limit,
                &ctx,
            )
            .await?
        }
    }

    Ok(())
}
