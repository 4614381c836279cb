//! Command-line baker for precomputed atmospheric scattering tables.
//!
//! Settings are loaded from `bake.ron` in the config directory and can be
//! overridden via CLI flags, e.g.
//! `cargo run --release -p aether-bake -- --max-order 6 --output sky --debug-hdr`.

mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use aether_atmosphere::{BakeOrchestrator, ExportError, LayoutError, initialize_atmosphere, write_outputs};
use aether_config::{CliArgs, Config, ConfigError, default_config_dir};
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
enum BakeError {
    #[error("invalid bake configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid texture layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("failed to write sky tables: {0}")]
    Export(#[from] ExportError),
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    let (mut config, origin) = settings::load_config(&config_dir);
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    aether_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    origin.report();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), BakeError> {
    config.validate()?;

    let (atmosphere, _fixed) = initialize_atmosphere();
    if !atmosphere.is_physically_valid() {
        warn!("atmosphere parameters fall outside the expected physical range");
    }

    let executor = settings::executor(&config.bake);
    let orchestrator = BakeOrchestrator::new(atmosphere, settings::texture_layout(&config.layout))?
        .with_max_order(config.bake.max_scattering_order)
        .with_executor(executor);

    info!(
        max_order = orchestrator.max_scattering_order(),
        threads = executor.thread_count(),
        "baking sky tables"
    );
    let tables = orchestrator.bake();
    for timing in &tables.timings {
        info!(
            stage = %timing.stage,
            elapsed_ms = timing.elapsed.as_millis() as u64,
            "stage timing"
        );
    }
    info!(total_ms = tables.total_elapsed().as_millis() as u64, "bake complete");

    let written = write_outputs(
        &config.output.directory,
        &tables,
        &settings::export_options(&config.output),
    )?;
    info!(
        files = written.len(),
        directory = %config.output.directory.display(),
        "sky tables written"
    );
    Ok(())
}
