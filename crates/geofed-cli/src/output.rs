//! Output formatting for geofed (json, table)

use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON (default)
    #[default]
    Json,
    /// ASCII table
    Table,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
}

impl OutputContext {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print rows in the configured format
    pub fn print<T: Tabled + Serialize>(&self, rows: &[T]) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Table => {
                if rows.is_empty() {
                    println!("No data");
                } else {
                    println!("{}", Table::new(rows));
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        }
        Ok(())
    }

    /// Print a single value; tables fall back to JSON for nested data
    pub fn print_value<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

// =============================================================================
// Display types for the commands
// =============================================================================

/// Row of the `types` command
#[derive(Debug, Tabled, Serialize)]
pub struct TypeRow {
    #[tabled(rename = "Type")]
    pub name: String,
    #[tabled(rename = "Backends")]
    pub backends: String,
}

/// Row of the `schema` command
#[derive(Debug, Tabled, Serialize)]
pub struct AttributeRow {
    #[tabled(rename = "Attribute")]
    pub name: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub value_type: String,
    #[tabled(rename = "Nullable")]
    pub nullable: bool,
    #[tabled(rename = "CRS")]
    pub crs: String,
}

/// Row of the `features` command
#[derive(Debug, Tabled, Serialize)]
pub struct FeatureRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Attributes")]
    pub attributes: String,
}
