//! TOML network description files

use deepsim_runtime::{
    ActParams, DeepAttnParams, DeepBurstParams, DeepCtxtParams, DeepLayer, DeepTrcParams, Layer, LayerRole,
    Network, NetworkBuilder, OptThreshParams, Pattern, PrjnConfig, ProjectionKind, Shape, SimulationParams,
    TrialInput,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CliError, CliResult};

/// Sample file written by `deepsim init`
pub const SAMPLE_NETWORK: &str = r#"# deepsim network description

[sim]
cycles_per_quarter = 25
quarters = 4
trials = 2
decay = 1.0
record_vars = ["Act", "DeepBurst", "DeepCtxt", "TRCBurstGe"]

# Defaults for every layer without its own [layers.opt_thresh]
[opt_thresh]
send = 0.1
delta = 0.005

[[layers]]
name = "V1"
role = "super"
shape = [2, 2]

[[layers]]
name = "V1D"
role = "deep"
shape = [2, 2]

[layers.deep_ctxt]
fm_prv = 0.0

[[layers]]
name = "LGN"
role = "trc"
shape = [2, 2]

[layers.deep_trc]
binarize = false

[[projections]]
from = "V1"
to = "V1D"
kind = "burst_ctxt"
pattern = "one_to_one"

[[projections]]
from = "V1"
to = "LGN"
kind = "burst_trc"
pattern = "one_to_one"

[[projections]]
from = "V1D"
to = "V1"
kind = "deep_attn"
weight = 0.5

[[inputs]]
layer = "V1"
patterns = [
    [1.0, 0.0, 0.0, 1.0],
    [0.0, 1.0, 1.0, 0.0],
]
"#;

/// A network description with simulation settings and inputs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkFile {
    /// Simulation settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim: Option<SimulationParams>,

    /// Send thresholds shared by layers without their own
    #[serde(default)]
    pub opt_thresh: OptThreshParams,

    /// Layers, in network order
    #[serde(default)]
    pub layers: Vec<LayerSpec>,

    /// Projections between layers
    #[serde(default)]
    pub projections: Vec<ProjectionSpec>,

    /// External clamps
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
}

/// One `[[layers]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Unique layer name
    pub name: String,
    /// Role in the loop
    #[serde(default)]
    pub role: LayerRole,
    /// Dimension sizes
    pub shape: Vec<usize>,
    /// Lay out units column-major
    #[serde(default)]
    pub col_major: bool,
    /// Optional dimension names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dim_names: Vec<String>,
    /// Activation parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub act: Option<ActParams>,
    /// Send thresholds, overriding the file-wide ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_thresh: Option<OptThreshParams>,
    /// Burst parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_burst: Option<DeepBurstParams>,
    /// Context parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_ctxt: Option<DeepCtxtParams>,
    /// Thalamic relay parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_trc: Option<DeepTrcParams>,
    /// Attention parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_attn: Option<DeepAttnParams>,
}

/// One `[[projections]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    /// Sending layer name
    pub from: String,
    /// Receiving layer name
    pub to: String,
    /// Signal carried
    #[serde(default)]
    pub kind: ProjectionKind,
    /// Connectivity pattern
    #[serde(default)]
    pub pattern: Pattern,
    /// Initial weight
    #[serde(default = "one")]
    pub weight: f32,
    /// Absolute scale
    #[serde(default = "one")]
    pub scale: f32,
    /// Start disabled
    #[serde(default)]
    pub off: bool,
}

fn one() -> f32 {
    1.0
}

/// One `[[inputs]]` entry: a clamp pattern per trial, reused cyclically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Clamped layer
    pub layer: String,
    /// One value vector per trial
    pub patterns: Vec<Vec<f32>>,
}

impl NetworkFile {
    /// Parse a description from TOML text
    pub fn from_toml_str(content: &str) -> CliResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a description from disk
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Err(CliError::missing_resource(format!("network file {}", path.display())));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read network file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Simulation settings of the file, or the defaults
    pub fn sim_params(&self) -> SimulationParams {
        self.sim.clone().unwrap_or_default()
    }

    /// Assemble and build the described network
    pub fn build_network(&self) -> CliResult<Network> {
        if self.layers.is_empty() {
            return Err(CliError::config("network file declares no layers"));
        }

        let mut builder = NetworkBuilder::new();
        for spec in &self.layers {
            builder = builder.add_layer(spec.to_layer(self.opt_thresh));
        }
        for spec in &self.projections {
            builder = builder.connect_with(
                &spec.from,
                &spec.to,
                PrjnConfig {
                    kind: spec.kind,
                    pattern: spec.pattern,
                    weight: spec.weight,
                    scale: spec.scale,
                    off: spec.off,
                },
            );
        }
        Ok(builder.build()?)
    }

    /// Clamps for each input pattern, in trial order
    pub fn trial_inputs(&self) -> Vec<Vec<TrialInput>> {
        let n = self.inputs.iter().map(|i| i.patterns.len()).max().unwrap_or(0);
        (0..n)
            .map(|t| {
                self.inputs
                    .iter()
                    .filter(|i| !i.patterns.is_empty())
                    .map(|i| TrialInput::new(i.layer.clone(), i.patterns[t % i.patterns.len()].clone()))
                    .collect()
            })
            .collect()
    }
}

impl LayerSpec {
    fn to_layer(&self, default_thresh: OptThreshParams) -> DeepLayer {
        let shape = if self.col_major {
            Shape::col_major(&self.shape)
        } else {
            Shape::new(&self.shape)
        };
        let shape = if self.dim_names.is_empty() {
            shape
        } else {
            shape.with_names(self.dim_names.as_slice())
        };

        let base = Layer::new(self.name.clone(), shape)
            .with_act_params(self.act.unwrap_or_default())
            .with_opt_thresh(self.opt_thresh.unwrap_or(default_thresh));
        let mut layer = DeepLayer::from_base(base, self.role);
        if let Some(p) = self.deep_burst {
            layer.deep_burst = p;
        }
        if let Some(p) = self.deep_ctxt {
            layer.deep_ctxt = p;
        }
        if let Some(p) = self.deep_trc {
            layer.deep_trc = p;
        }
        if let Some(p) = self.deep_attn {
            layer.deep_attn = p;
        }
        layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepsim_runtime::{DeepError, LayerOps};

    #[test]
    fn test_sample_builds() {
        let file = NetworkFile::from_toml_str(SAMPLE_NETWORK).unwrap();
        assert_eq!(file.sim_params().trials, 2);
        assert_eq!(file.sim_params().cycles_per_quarter, 25);
        assert_eq!(file.layers[2].role, LayerRole::ThalamicRelay);
        assert_eq!(file.projections[0].kind, ProjectionKind::BurstCtxt);
        assert_eq!(file.projections[0].pattern, Pattern::OneToOne);
        assert_eq!(file.projections[2].weight, 0.5);

        let net = file.build_network().unwrap();
        assert_eq!(net.num_layers(), 3);
        assert_eq!(net.num_prjns(), 3);
        assert_eq!(net.layer_by_name("V1D").unwrap().num_units(), 4);
    }

    #[test]
    fn test_trial_inputs_cycle() {
        let file = NetworkFile::from_toml_str(
            r#"
            [[layers]]
            name = "A"
            shape = [2]

            [[layers]]
            name = "B"
            shape = [1]

            [[inputs]]
            layer = "A"
            patterns = [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]

            [[inputs]]
            layer = "B"
            patterns = [[0.5]]
            "#,
        )
        .unwrap();
        let inputs = file.trial_inputs();
        assert!(file.sim.is_none());
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[2][0], TrialInput::new("A", vec![1.0, 1.0]));
        assert_eq!(inputs[2][1], TrialInput::new("B", vec![0.5]));
        assert_eq!(file.layers[0].role, LayerRole::Superficial);
    }

    #[test]
    fn test_bad_files() {
        assert!(matches!(
            NetworkFile::from_toml_str("[[layers]]\nname = \"A\"\nrole = \"cortex\"\nshape = [2]\n"),
            Err(CliError::Toml(_))
        ));
        assert!(matches!(
            NetworkFile::default().build_network(),
            Err(CliError::Config(_))
        ));

        let file = NetworkFile::from_toml_str(
            "[[layers]]\nname = \"A\"\nshape = [2]\n\n[[projections]]\nfrom = \"A\"\nto = \"B\"\n",
        )
        .unwrap();
        assert!(matches!(
            file.build_network(),
            Err(CliError::Runtime(DeepError::LayerNotFound { .. }))
        ));

        let file = NetworkFile::from_toml_str("[[layers]]\nname = \"A\"\nshape = [0]\n").unwrap();
        assert!(matches!(
            file.build_network(),
            Err(CliError::Runtime(DeepError::BuildFailure { .. }))
        ));
    }

    #[test]
    fn test_load_reports_read_failures() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NetworkFile::load(&dir.path().join("absent.toml")),
            Err(CliError::MissingResource(_))
        ));

        // a directory exists but cannot be read as a file
        let err = NetworkFile::load(dir.path()).unwrap_err();
        assert!(matches!(err, CliError::Generic(_)));
        assert!(err.to_string().contains("Failed to read network file"));
    }

    #[test]
    fn test_layer_overrides() {
        let file = NetworkFile::from_toml_str(
            r#"
            [opt_thresh]
            send = 0.2

            [[layers]]
            name = "A"
            shape = [2, 3]
            col_major = true

            [layers.deep_attn]
            on = false

            [[layers]]
            name = "B"
            shape = [2]

            [layers.opt_thresh]
            send = 0.05
            delta = 0.01
            "#,
        )
        .unwrap();
        let net = file.build_network().unwrap();
        let a = net.layer_by_name("A").unwrap();
        assert!(a.shape().is_col_major());
        assert!(!a.deep_attn.on);
        assert_eq!(a.base().opt_thresh.send, 0.2);
        assert_eq!(a.base().opt_thresh.delta, 0.005);
        assert_eq!(net.layer_by_name("B").unwrap().base().opt_thresh.send, 0.05);
    }
}
