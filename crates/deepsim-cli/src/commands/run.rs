//! Simulation run command

use anyhow::Context;
use clap::Args;
use deepsim_runtime::{run_trials, SimulationParams, SimulationResult};
use std::path::PathBuf;
use tracing::info;

use crate::{
    config::CliConfig,
    error::{CliError, CliResult},
    network_file::NetworkFile,
};

/// Run the trials described by a network file
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Network description (TOML)
    pub file: PathBuf,

    /// Number of trials (overrides the file)
    #[arg(short, long)]
    pub trials: Option<usize>,

    /// Cycles per quarter (overrides the file)
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Variables to record, comma separated (overrides the file)
    #[arg(short, long, value_delimiter = ',')]
    pub record: Vec<String>,

    /// Write trial records as JSON to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Collect per-cycle timing
    #[arg(long)]
    pub perf: bool,
}

impl RunCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let file = NetworkFile::load(&self.file)?;
        let net = file.build_network()?;

        let mut params = file.sim.clone().unwrap_or_else(|| SimulationParams {
            trials: config.default_trials.unwrap_or(1),
            ..SimulationParams::default()
        });
        if let Some(trials) = self.trials {
            params.trials = trials;
        }
        if let Some(cycles) = self.cycles {
            params.cycles_per_quarter = cycles;
        }
        if !self.record.is_empty() {
            params.record_vars = self.record.clone();
        }
        if self.perf {
            params.perf_enabled = true;
        }
        if params.trials == 0 {
            return Err(CliError::invalid_args("nothing to run: trials is 0"));
        }

        info!(
            "Running {} ({} layers, {} projections)",
            self.file.display(),
            net.num_layers(),
            net.num_prjns()
        );
        let result = run_trials(net, params, file.trial_inputs())?;

        if config.preferences.show_summary {
            print_summary(&result);
        }

        if let Some(out) = &self.out {
            let json = if config.preferences.pretty_json {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            if let Some(parent) = out.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
                }
            }
            std::fs::write(out, json)
                .with_context(|| format!("Failed to write trial records to {}", out.display()))?;
            info!("Trial records written to: {}", out.display());
        }
        Ok(())
    }
}

fn print_summary(result: &SimulationResult) {
    for trial in &result.trials {
        println!(
            "trial {:>4}: act {} sends / {} unsends, burst {} / {}, context {}",
            trial.trial,
            trial.stats.act.sends,
            trial.stats.act.unsends,
            trial.stats.trc_burst.sends,
            trial.stats.trc_burst.unsends,
            trial.stats.ctxt
        );
    }
    println!(
        "Completed {} trials ({} cycles)",
        result.trials.len(),
        result.cycles_executed
    );
    if let Some(perf) = &result.perf {
        println!(
            "Cycle time: avg {} ns, max {} ns over {} cycles",
            perf.avg_cycle_ns, perf.max_cycle_ns, perf.cycles
        );
    }
}
