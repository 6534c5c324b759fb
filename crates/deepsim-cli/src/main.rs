//! # deepsim CLI
//!
//! Runs cortical-thalamic delta-propagation networks described in TOML files.

use clap::Parser;
use std::io::IsTerminal;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deepsim_cli::{config::CliConfig, error::CliResult, DeepsimCli};

fn main() -> CliResult<()> {
    let cli = DeepsimCli::parse();

    // RUST_LOG wins, then -v, then the configured level
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        CliConfig::resolve(cli.config.as_deref())
            .ok()
            .and_then(|c| c.log_level)
            .unwrap_or_else(|| "info".to_string())
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so summaries on stdout stay pipeable
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    if let Err(err) = cli.execute() {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }

    Ok(())
}
