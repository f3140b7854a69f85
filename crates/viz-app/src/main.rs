//! vizfilter - filter a CSV table from the command line
//!
//! Usage:
//!   vizfilter --table sales.csv --filter '{"sales": {"$gt": 10000}}'
//!   vizfilter --table sales.csv --filter @filter.json --key country --negate
//!   vizfilter --table sales.csv --modules modules.json --filter '{"_": "myFilter", "p": "x", "v": 1}'

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use viz_core::module::{load_module, shared, SharedRegistry};
use viz_core::{ModuleConfig, ModuleRegistry};
use viz_data::{CsvLoader, CsvOptions, TableModel};
use viz_filter::{declare_filter_types, BuiltinFilterLoader, Filter, FilterKind};

mod output;

#[derive(Parser)]
#[command(name = "vizfilter")]
#[command(about = "Evaluate a filter spec against a CSV table")]
struct Cli {
    /// CSV file to filter
    #[arg(short, long)]
    table: PathBuf,

    /// Filter spec as JSON, or @path to read it from a file (default: all rows)
    #[arg(short, long)]
    filter: Option<String>,

    /// Module declarations (JSON) adding filter types and aliases
    #[arg(short, long)]
    modules: Option<PathBuf>,

    /// Key column (repeatable)
    #[arg(short, long = "key")]
    keys: Vec<String>,

    /// Field delimiter of the CSV file
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Negate the filter before evaluating it
    #[arg(long)]
    negate: bool,

    /// Simplify the filter before evaluating it
    #[arg(long)]
    simplify: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn read_filter(arg: Option<&str>) -> Result<serde_json::Value> {
    let text = match arg {
        None => return Ok(serde_json::Value::Bool(true)),
        Some(arg) => match arg.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading filter file {}", path))?,
            None => arg.to_string(),
        },
    };
    serde_json::from_str(&text).context("parsing filter spec")
}

/// Registry holding the built-in filter types plus any configured modules
async fn build_registry(modules: Option<&PathBuf>) -> Result<SharedRegistry> {
    let mut registry = ModuleRegistry::new();
    declare_filter_types(&mut registry)?;

    if let Some(path) = modules {
        let config = ModuleConfig::from_path(path)?;
        registry.configure(&config)?;
    }

    let registry = shared(registry);
    for kind in FilterKind::ALL {
        load_module(&registry, &kind.type_id(), &BuiltinFilterLoader).await?;
    }
    debug!("Loaded {} built-in filter types", FilterKind::ALL.len());

    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = build_registry(cli.modules.as_ref()).await?;

    let spec = read_filter(cli.filter.as_deref())?;
    let mut filter = Filter::from_spec_in(&spec, &registry.read())?;
    if cli.negate {
        filter = filter.negate();
    }
    if cli.simplify {
        filter = filter.simplify();
    }
    info!("Filter {}", filter.content_key());

    let options = CsvOptions {
        delimiter: cli.delimiter,
        key_columns: cli.keys.clone(),
        ..CsvOptions::default()
    };
    let table = CsvLoader::new(options)
        .load_path(&cli.table)
        .with_context(|| format!("loading table {}", cli.table.display()))?;

    let view = filter.apply(&table);
    info!("{} of {} rows selected", view.row_indices().len(), table.number_of_rows());

    match cli.format {
        Format::Text => {
            if cli.modules.is_some() {
                output::print_type_forest(&registry.read())?;
            }
            output::print_text(&filter, &view)
        }
        Format::Json => output::print_json(&filter, &view),
    }
}
