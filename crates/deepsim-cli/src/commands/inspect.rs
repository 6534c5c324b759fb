//! Network file inspection command

use clap::Args;
use deepsim_runtime::{LayerId, LayerOps, Network};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::{error::CliResult, network_file::NetworkFile};

/// Summarize a network file
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Network description (TOML)
    pub file: PathBuf,

    /// Show parameters of every layer
    #[arg(short, long)]
    pub detailed: bool,
}

impl InspectCommand {
    pub fn execute(self) -> CliResult<()> {
        info!("Inspecting {}", self.file.display());

        let file = NetworkFile::load(&self.file)?;
        let net = file.build_network()?;

        self.print_layers(&net);
        print_projections(&net);

        let sim = file.sim_params();
        println!(
            "Simulation: {} trials x {} quarters x {} cycles, decay {}",
            sim.trials, sim.quarters, sim.cycles_per_quarter, sim.decay
        );
        println!("Input patterns: {}", file.trial_inputs().len());

        let silent: Vec<&str> = net
            .layers()
            .iter()
            .filter(|ly| ly.send_prjns().is_empty() && ly.recv_prjns().is_empty())
            .map(|ly| ly.name())
            .collect();
        if !silent.is_empty() {
            warn!("Layers without projections: {}", silent.join(", "));
        }
        Ok(())
    }

    fn print_layers(&self, net: &Network) {
        println!("Layers ({}):", net.num_layers());
        for ly in net.layers() {
            println!(
                "  {:<12} {:<6} shape {:<10} units {:>6}  send {} recv {}",
                ly.name(),
                ly.role().as_str(),
                ly.shape().to_string(),
                ly.num_units(),
                ly.send_prjns().len(),
                ly.recv_prjns().len()
            );
            if self.detailed {
                println!("      act        {:?}", ly.base().act);
                println!("      opt_thresh {:?}", ly.base().opt_thresh);
                println!("      deep_burst {:?}", ly.deep_burst);
                println!("      deep_ctxt  {:?}", ly.deep_ctxt);
                println!("      deep_trc   {:?}", ly.deep_trc);
                println!("      deep_attn  {:?}", ly.deep_attn);
            }
        }
    }
}

fn print_projections(net: &Network) {
    println!("Projections ({}):", net.num_prjns());
    for (i, pj) in net.prjns().iter().enumerate() {
        println!(
            "  P{:<3} {} -> {} {:<10} {:?} cons {}{}",
            i,
            layer_name(net, pj.send),
            layer_name(net, pj.recv),
            pj.kind().as_str(),
            pj.pattern(),
            pj.num_cons(),
            if pj.is_off() { " (off)" } else { "" }
        );
    }
}

fn layer_name(net: &Network, id: LayerId) -> &str {
    net.layer(id).map(|ly| ly.name()).unwrap_or("?")
}
