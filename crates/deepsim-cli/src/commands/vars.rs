//! Variable listing command

use clap::Args;
use deepsim_runtime::{ALL_NEURON_VARS, DEEP_NEURON_VARS, NEURON_VARS};

use crate::error::CliResult;

/// List unit variable names
#[derive(Args, Debug)]
pub struct VarsCommand {
    /// Only the variables of the base rate-coded model
    #[arg(long, conflicts_with = "deep")]
    pub base: bool,

    /// Only the variables added by deep layers
    #[arg(long)]
    pub deep: bool,
}

impl VarsCommand {
    pub fn execute(self) -> CliResult<()> {
        let vars: &[&str] = if self.base {
            &NEURON_VARS
        } else if self.deep {
            &DEEP_NEURON_VARS
        } else {
            &ALL_NEURON_VARS
        };
        for var in vars {
            println!("{}", var);
        }
        Ok(())
    }
}
