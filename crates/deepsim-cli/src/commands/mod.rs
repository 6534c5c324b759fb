//! CLI command implementations for deepsim

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{config::CliConfig, error::CliResult};

pub mod init;
pub mod inspect;
pub mod run;
pub mod vars;

/// deepsim - cortical-thalamic delta-propagation simulator
#[derive(Parser, Debug)]
#[command(
    name = "deepsim",
    version,
    about = "Cortical-thalamic delta-propagation simulator",
    long_about = "deepsim runs rate-coded networks of superficial, deep and thalamic relay \
                  layers described in TOML files, sending activation and burst changes only \
                  when they cross a threshold."
)]
pub struct DeepsimCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DEEPSIM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a sample network file
    #[command(alias = "new")]
    Init(init::InitCommand),

    /// Summarize the layers and projections of a network file
    Inspect(inspect::InspectCommand),

    /// List unit variable names
    Vars(vars::VarsCommand),

    /// Run the trials described by a network file
    Run(run::RunCommand),
}

impl DeepsimCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        let config = CliConfig::resolve(self.config.as_deref())?;

        match self.command {
            Commands::Init(cmd) => cmd.execute(),
            Commands::Inspect(cmd) => cmd.execute(),
            Commands::Vars(cmd) => cmd.execute(),
            Commands::Run(cmd) => cmd.execute(&config),
        }
    }
}
