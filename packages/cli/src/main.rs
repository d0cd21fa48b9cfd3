#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `ward_cover`: per-region land-cover coverage and change.
//!
//! `ward_cover run <CONFIG>` loads the layers named by a TOML run config,
//! computes coverage for every region and writes a CSV or JSON report.
//! `ward_cover check <CONFIG>` only loads and validates the inputs.
//!
//! Uses `indicatif-log-bridge` (via [`ward_cover_cli_utils::init_logger`])
//! so that log lines and the progress bar never fight for the terminal.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ward_cover_cli_utils::{IndicatifProgress, MultiProgress};
use ward_cover_engine::CoverageReport;
use ward_cover_io::{AreaUnit, OutputFormat, load_config, write_report};

#[derive(Parser)]
#[command(name = "ward_cover")]
#[command(about = "Per-region land-cover coverage and change")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute coverage for every region and write the report
    Run {
        /// Path to the TOML run config
        config: PathBuf,

        /// Report path (stdout when neither this nor `[output] path` is set)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Report format: csv or json
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Area unit: square_metres, hectares or square_kilometres
        #[arg(long)]
        unit: Option<AreaUnit>,
    },
    /// Load and validate inputs without computing coverage
    Check {
        /// Path to the TOML run config
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = ward_cover_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output,
            format,
            unit,
        } => run(&multi, &config, output, format, unit),
        Commands::Check { config } => check(&config),
    }
}

fn run(
    multi: &MultiProgress,
    config_path: &Path,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    unit: Option<AreaUnit>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let request = config.build_request()?;

    let progress = IndicatifProgress::regions_bar(multi, "Validating inputs");
    let report = ward_cover_engine::run(request, &progress)?;

    let format = format.unwrap_or(config.output.format);
    let unit = unit.unwrap_or(config.output.unit);

    match output.or(config.output.path) {
        Some(path) => {
            let file = BufWriter::new(File::create(&path)?);
            write_report(&report, format, unit, file)?;
            log::info!("Wrote {} rows to {}", report.rows.len(), path.display());
        }
        None => write_report(&report, format, unit, std::io::stdout().lock())?,
    }

    log_summary(&report);

    Ok(())
}

fn check(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let request = config.build_request()?;
    let prepared = ward_cover_engine::prepare(request)?;

    println!(
        "{} regions accepted, {} rejected (CRS {})",
        prepared.regions.len(),
        prepared.rejected_regions.len(),
        prepared.crs
    );
    for rejected in &prepared.rejected_regions {
        println!("  rejected {} ({}): {}", rejected.id, rejected.name, rejected.reason);
    }
    for snapshot in &prepared.snapshots {
        let skipped = prepared.skipped_features.get(snapshot).copied().unwrap_or(0);
        println!("  snapshot {snapshot}: {skipped} features skipped");
    }

    Ok(())
}

fn log_summary(report: &CoverageReport) {
    let summary = &report.summary;

    match (summary.coverage_percent, &report.prior, summary.change) {
        (Some(percent), Some(prior), Some(change)) => log::info!(
            "Study area: {percent:.2}% covered in {} ({change:+.2} points since {prior})",
            report.current
        ),
        (Some(percent), _, _) => {
            log::info!("Study area: {percent:.2}% covered in {}", report.current);
        }
        (None, _, _) => log::warn!("No complete regions to summarize"),
    }

    if summary.incomplete_regions > 0 {
        log::warn!(
            "{} regions are missing a snapshot and were left out of the summary",
            summary.incomplete_regions
        );
    }
    if !report.rejected_regions.is_empty() {
        log::warn!("{} regions were rejected", report.rejected_regions.len());
    }
}
