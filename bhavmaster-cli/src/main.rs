//! Bhavmaster CLI — fetch raw files, build master datasets, inspect stores.
//!
//! Commands:
//! - `fetch` — download the latest published raw file for a source
//! - `build` — run one (or all) master builders against the latest raw files
//! - `status` — report row counts and date ranges across all masters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use bhavmaster_core::AssetClass;
use bhavmaster_pipeline::{
    build, master_status, save_report, Fetcher, PipelineConfig, RawSource,
};

#[derive(Parser)]
#[command(
    name = "bhavmaster",
    about = "Exchange EOD master-dataset builder"
)]
struct Cli {
    /// Path to a pipeline config TOML file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data root directory.
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the latest published raw file for a source.
    Fetch {
        /// Raw source: cm (equity bhavcopy zip), fo (derivatives zip),
        /// mto (delivery .DAT), index (index OHLC snapshot).
        source: FetchSource,
    },
    /// Build master datasets from the latest raw files.
    Build {
        /// Asset class to build, or `all`.
        target: BuildTarget,

        /// Skip writing the JSON report artifact.
        #[arg(long, default_value_t = false)]
        no_report: bool,
    },
    /// Report row counts and date ranges across all masters.
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FetchSource {
    Cm,
    Fo,
    Mto,
    Index,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BuildTarget {
    Equity,
    Futures,
    Options,
    Delivery,
    Index,
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref(), cli.data_root)?;

    match cli.command {
        Commands::Fetch { source } => run_fetch(source, &cfg),
        Commands::Build { target, no_report } => run_build(target, &cfg, no_report),
        Commands::Status => run_status(&cfg),
    }
}

fn load_config(path: Option<&Path>, data_root: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut cfg = match path {
        Some(p) => PipelineConfig::from_file(p)
            .with_context(|| format!("load config {}", p.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = data_root {
        cfg.data_root = root;
    }
    Ok(cfg)
}

fn run_fetch(source: FetchSource, cfg: &PipelineConfig) -> Result<()> {
    let source = match source {
        FetchSource::Cm => RawSource::CmBhavcopy,
        FetchSource::Fo => RawSource::FoBhavcopy,
        FetchSource::Mto => RawSource::MtoDelivery,
        FetchSource::Index => RawSource::IndexOhlc,
    };

    let fetcher = Fetcher::new()?;
    let outcome = fetcher.fetch_latest(source, cfg)?;

    if outcome.already_present {
        println!(
            "Already present ({}): {}",
            outcome.trade_date,
            outcome.path.display()
        );
    } else {
        println!(
            "Downloaded {} → {}",
            outcome.trade_date,
            outcome.path.display()
        );
    }
    Ok(())
}

fn run_build(target: BuildTarget, cfg: &PipelineConfig, no_report: bool) -> Result<()> {
    let classes: Vec<AssetClass> = match target {
        BuildTarget::Equity => vec![AssetClass::Equity],
        BuildTarget::Futures => vec![AssetClass::Futures],
        BuildTarget::Options => vec![AssetClass::Options],
        BuildTarget::Delivery => vec![AssetClass::Delivery],
        BuildTarget::Index => vec![AssetClass::Index],
        BuildTarget::All => vec![
            AssetClass::Equity,
            AssetClass::Futures,
            AssetClass::Options,
            AssetClass::Delivery,
            AssetClass::Index,
        ],
    };

    let mut failed = 0;
    for class in classes {
        match build(class, cfg) {
            Ok(report) => {
                print!("{report}");
                if !no_report {
                    let path = save_report(&report, &cfg.reports_dir())?;
                    println!("Report saved to: {}", path.display());
                }
                println!();
            }
            Err(e) => {
                eprintln!("Build failed for {}: {e}", class.name());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_status(cfg: &PipelineConfig) -> Result<()> {
    let statuses = master_status(cfg)?;
    if statuses.is_empty() {
        println!("No master datasets under {}", cfg.data_root.display());
        return Ok(());
    }

    println!("{:<16} {:<20} {:>8}  {:<22}", "Area", "Entity", "Rows", "Date Range");
    println!("{}", "-".repeat(70));
    for status in statuses {
        let range = match (status.first_date, status.last_date) {
            (Some(first), Some(last)) => format!("{first} → {last}"),
            _ => "(no dates)".to_string(),
        };
        println!(
            "{:<16} {:<20} {:>8}  {:<22}",
            status.area, status.entity, status.rows, range
        );
    }
    Ok(())
}
