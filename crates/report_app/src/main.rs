mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use report_capture::{CaptureChain, CaptureTarget, StaticImageElement};
use report_core::{DatasetRegistry, ExportConfig, ExportRequest, logging};
use report_export::{DirectorySink, Exporter, LogNotifier};

use cli::{ChartArg, Cli};

fn load_config(cli: &Cli) -> Result<ExportConfig> {
    match &cli.config {
        Some(path) => ExportConfig::load_from(path),
        None => ExportConfig::load(),
    }
}

/// Charts whose file cannot be read are left out, like any failed capture.
fn load_targets(charts: &[ChartArg]) -> Vec<CaptureTarget> {
    charts
        .iter()
        .filter_map(|chart| match StaticImageElement::from_path(&chart.id, &chart.path) {
            Ok(element) => Some(CaptureTarget::new(&chart.id, &chart.title, Box::new(element))),
            Err(e) => {
                warn!("Skipping chart '{}': {e:#}", chart.id);
                None
            }
        })
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let _log_guard = logging::init_logging(&config).context("Failed to initialize logging")?;
    info!("report-export v{}", env!("CARGO_PKG_VERSION"));

    let input = std::fs::read_to_string(&cli.datasets)
        .with_context(|| format!("Failed to read datasets: {}", cli.datasets.display()))?;
    let registry = DatasetRegistry::from_json_str(&input)
        .with_context(|| format!("Invalid datasets file: {}", cli.datasets.display()))?;

    let dataset_names: Vec<String> = if cli.select.is_empty() {
        registry.names().map(String::from).collect()
    } else {
        cli.select.clone()
    };
    let targets = load_targets(&cli.charts);
    let capture_ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();

    let request = ExportRequest::new(&cli.title, cli.format)
        .with_datasets(dataset_names)
        .with_captures(capture_ids);

    let chain = CaptureChain::standard(None, None, &config);
    let exporter = Exporter::new(
        config,
        Box::new(DirectorySink::new(&cli.out)),
        Arc::new(LogNotifier),
    )
    .with_capture_chain(chain);

    match exporter.run(&registry, &targets, &request) {
        Ok(report) => {
            for location in &report.locations {
                println!("{location}");
            }
            for skipped in report.skipped_datasets.iter().chain(&report.skipped_captures) {
                eprintln!("skipped {}: {}", skipped.name, skipped.reason);
            }
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!(err.user_message())),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
