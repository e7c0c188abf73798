//! Usage metrics aggregator.
//!
//! Reads every raw observation report under a directory and writes the
//! internal and external usage reports.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use usage_metrics::aggregate::{self, report_timestamp, write_reports};
use usage_metrics::catalog::DirectoryProvider;
use usage_metrics::config::{load_config, loader::apply_env_overrides, MetricsConfig};
use usage_metrics::model;
use usage_metrics::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "usage-metrics")]
#[command(about = "Aggregate recorded API usage into per-service reports", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold all raw reports under DIR into usage reports
    Aggregate {
        /// Directory searched recursively for raw reports
        dir: PathBuf,

        /// Directory of service specifications
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output directory (default: DIR/metrics)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the zero-valued coverage map for a catalog
    Skeleton {
        /// Directory of service specifications
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = MetricsConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            config
        }
    };
    init_logging(&config.observability.log_level)?;

    match cli.command {
        Commands::Aggregate {
            dir,
            catalog,
            output,
        } => {
            if !dir.is_dir() {
                eprintln!("Error: {} is not a directory", dir.display());
                std::process::exit(2);
            }

            let spec_dir = catalog.unwrap_or(config.catalog.spec_dir);
            let provider = DirectoryProvider::new(spec_dir);
            tracing::info!(catalog = %provider.dir().display(), input = %dir.display(), "Aggregating");

            let reports =
                aggregate::aggregate(&dir, &provider, &config.aggregation.raw_file_prefix)?;

            let output_dir = output
                .or(config.aggregation.output_dir)
                .unwrap_or_else(|| dir.join("metrics"));
            let paths = write_reports(&output_dir, &reports, &report_timestamp())?;

            println!(
                "files: {}, rows: {}, skipped (xfail): {}",
                reports.summary.files, reports.summary.rows, reports.summary.skipped_xfail
            );
            println!("{}", paths.external.display());
            println!("{}", paths.internal.display());
        }
        Commands::Skeleton { catalog } => {
            let provider = DirectoryProvider::new(catalog.unwrap_or(config.catalog.spec_dir));
            let skeleton = model::build_from_catalog(&provider);
            println!("{}", serde_json::to_string_pretty(&skeleton)?);
        }
    }

    Ok(())
}
