use anyhow::{Context, Result};
use clap::Parser;
use foldersort::logging::init_logging;
use foldersort::output::OutputFormatter;
use foldersort::{AppConfig, Cli, run_cli};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref()).context("Error loading configuration")?;
    if let Some(rules) = cli.rules {
        config.rules_path = Some(rules);
    }

    let log_dir = config.log_dir();
    // Logging is optional; keep working without a writable log directory.
    let _guard = match init_logging(&log_dir, &config.log_level, cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            OutputFormatter::warning(&format!(
                "Logging disabled, cannot use {}: {}",
                log_dir.display(),
                e
            ));
            None
        }
    };

    run_cli(cli.command, &config)
}
