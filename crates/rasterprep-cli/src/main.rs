//! rasterprep CLI - prepare candidate raster products and dispatch them to
//! the external metrics engine.

mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use output::OutputWriter;
use rasterprep_core::config::ToolConfig;
use rasterprep_pipeline::{MetricsPipeline, ProcessEngine, RunRequest};
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize tracing; RUST_LOG selects the verbosity.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);

    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, output: &OutputWriter) -> Result<()> {
    let mut config = ToolConfig::with_defaults();
    if let Some(path) = &cli.config {
        config = config
            .load_from_file(path)
            .with_context(|| format!("cannot load tool config {}", path.display()))?;
    }
    let mut config = config.load_from_env();
    config.update_from_cli(cli.engine.clone());
    tracing::debug!(
        engine = %config.engine.value,
        source = ?config.engine.source,
        "resolved engine command"
    );

    let template = match &cli.template {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("cannot read template {}", path.display()))?,
        ),
        None => None,
    };

    let request = RunRequest {
        reference_dir: cli.ref_dir,
        reference_prefix: cli.ref_prefix,
        test_dsm: cli.dsm,
        test_cls: cli.cls,
        test_mtl: cli.mtl,
        test_dtm: cli.dtm,
        output_dir: cli.output_dir,
        template,
    };

    let engine = ProcessEngine::new(config.engine.value.clone());
    let pipeline = MetricsPipeline::new(request, engine);

    let report = match pipeline.run() {
        Ok(report) => report,
        Err(failure) => {
            output.warning("the working directory is left intact for inspection");
            return Err(failure.into());
        }
    };

    if output.is_json() {
        output.result(serde_json::json!({
            "working_dir": report.working_dir,
            "config": report.config_path,
            "staged": report.staged,
            "target_crs": report.target_crs,
        }))?;
    } else {
        output.success("metrics evaluation completed");
        output.kv("Working directory", report.working_dir.display());
        output.kv("Config document", report.config_path.display());
        output.kv("Target CRS", &report.target_crs);
    }

    Ok(())
}
