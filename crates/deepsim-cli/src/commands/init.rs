//! Sample network file command

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::{
    error::{CliError, CliResult},
    network_file::SAMPLE_NETWORK,
};

/// Write a sample network file
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Path of the file to create
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn execute(self) -> CliResult<()> {
        if self.path.exists() && !self.force {
            return Err(CliError::invalid_args(format!(
                "{} already exists (use --force to overwrite)",
                self.path.display()
            )));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
        }
        std::fs::write(&self.path, SAMPLE_NETWORK)
            .with_context(|| format!("Failed to write network file {}", self.path.display()))?;

        info!("Network file written to: {}", self.path.display());
        info!("Run 'deepsim run {}' to simulate it", self.path.display());
        Ok(())
    }
}
