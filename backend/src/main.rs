//! Catalog relay CLI
//!
//! # Main Commands
//!
//! ```bash
//! catalog-relay serve                  # Start HTTP server (CATALOG_RELAY_BIND_ADDR)
//! catalog-relay dispatch catalog.csv   # Run the full pipeline against UPSTREAM_URL
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! catalog-relay parse catalog.csv      # Raw rows as JSON
//! catalog-relay normalize catalog.csv  # Validated shop partitions as JSON, nothing sent
//! ```

use catalog_relay::{
    api::start_server,
    config::{load_settings, parse_delimiter, Settings},
    dispatch::{Dispatcher, EnvCredentials},
    parser::parse_file,
    transform::pipeline::{integrate_bytes, prepare_file, PipelineOptions},
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-relay")]
#[command(about = "Validate product catalog CSVs and relay them to the shop catalog API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides the configured bind address port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Parse a CSV file and output raw rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (default: CSV_DELIMITER or ';')
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate and normalize a CSV file, output shop partitions as JSON
    Normalize {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (default: CSV_DELIMITER or ';')
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the full pipeline and send every record upstream
    Dispatch {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (default: CSV_DELIMITER or ';')
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Output file for the failure report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&settings.log_level);

    let result = match cli.command {
        Commands::Serve { port } => cmd_serve(settings, port).await,

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, &settings, delimiter.as_deref(), output.as_deref()),

        Commands::Normalize {
            input,
            delimiter,
            output,
        } => cmd_normalize(&input, &settings, delimiter.as_deref(), output.as_deref()),

        Commands::Dispatch {
            input,
            delimiter,
            output,
        } => cmd_dispatch(&input, &settings, delimiter.as_deref(), output.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so JSON on stdout stays pipeable.
fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn pipeline_options(
    settings: &Settings,
    delimiter: Option<&str>,
) -> Result<PipelineOptions, Box<dyn std::error::Error>> {
    let delimiter = match delimiter {
        Some(raw) => parse_delimiter(raw).map_err(|e| format!("--delimiter: {e}"))?,
        None => settings.csv_delimiter,
    };
    Ok(PipelineOptions { delimiter })
}

async fn cmd_serve(
    mut settings: Settings,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port {
        settings.bind_addr.set_port(port);
    }
    start_server(settings).await
}

fn cmd_parse(
    input: &Path,
    settings: &Settings,
    delimiter: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = pipeline_options(settings, delimiter)?;
    eprintln!("Parsing CSV: {}", input.display());

    let table = parse_file(input, options.delimiter)?;
    eprintln!("   Columns: {}", table.column_names().collect::<Vec<_>>().join(", "));
    eprintln!("   Parsed {} rows", table.row_count());

    let json = serde_json::to_string_pretty(&table.to_json_rows())?;
    write_output(&json, output)
}

fn cmd_normalize(
    input: &Path,
    settings: &Settings,
    delimiter: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = pipeline_options(settings, delimiter)?;
    eprintln!("Normalizing: {}", input.display());

    let partitions = prepare_file(input, &options)?;
    for partition in &partitions {
        eprintln!("   {}: {} records", partition.shop, partition.records.len());
    }

    let json = serde_json::to_string_pretty(&partitions)?;
    write_output(&json, output)
}

async fn cmd_dispatch(
    input: &Path,
    settings: &Settings,
    delimiter: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = pipeline_options(settings, delimiter)?;
    let dispatcher = Dispatcher::new(settings.dispatch_settings()?, Arc::new(EnvCredentials));
    eprintln!("Dispatching: {}", input.display());

    let bytes = fs::read(input)?;
    let report = integrate_bytes(&bytes, &options, &dispatcher).await?;

    let failed = report.failure_count();
    if failed == 0 {
        eprintln!("   All records accepted");
    } else {
        eprintln!("   {failed} records rejected");
    }

    let json = serde_json::to_string_pretty(&report)?;
    write_output(&json, output)
}

fn write_output(content: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("   Saved to: {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}
