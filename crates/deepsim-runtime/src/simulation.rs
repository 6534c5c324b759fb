//! Trial / quarter / cycle simulation loop

use crate::{
    error::*,
    layer::LayerOps,
    network::{Network, SendStats},
    neuron::ALL_NEURON_VARS,
};
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position of the current cycle within the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleTime {
    /// Cycle within the current quarter
    pub cycle: usize,
    /// Quarter within the current trial (0-based)
    pub quarter: usize,
    /// Trial counter
    pub trial: usize,
    /// Cycles since the start of the run
    pub cycle_tot: u64,
}

impl CycleTime {
    /// Time at the start of a run
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the within-trial counters
    pub fn trial_start(&mut self, trial: usize) {
        self.trial = trial;
        self.quarter = 0;
        self.cycle = 0;
    }

    /// Advance by one cycle
    pub fn cycle_inc(&mut self) {
        self.cycle += 1;
        self.cycle_tot += 1;
    }

    /// Advance to the next quarter
    pub fn quarter_inc(&mut self) {
        self.quarter += 1;
        self.cycle = 0;
    }
}

/// Simulation parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SimulationParams {
    /// Cycles run in every quarter
    pub cycles_per_quarter: usize,
    /// Quarters per trial (at most four)
    pub quarters: usize,
    /// Number of trials
    pub trials: usize,
    /// Decay applied to activations at the start of each trial
    pub decay: f32,
    /// Variables recorded for every layer at the end of each trial
    pub record_vars: Vec<String>,
    /// Enable per-cycle timing
    pub perf_enabled: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            cycles_per_quarter: 25,
            quarters: 4,
            trials: 1,
            decay: 1.0,
            record_vars: vec!["Act".to_string()],
            perf_enabled: false,
        }
    }
}

impl SimulationParams {
    /// Create new simulation parameters with validation
    pub fn new(cycles_per_quarter: usize, trials: usize) -> Result<Self> {
        let params = Self {
            cycles_per_quarter,
            trials,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Set the between-trial decay
    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    /// Set the variables recorded per layer
    pub fn with_record_vars<S: Into<String>>(mut self, vars: impl IntoIterator<Item = S>) -> Self {
        self.record_vars = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable performance sampling
    pub fn with_perf(mut self, enabled: bool) -> Self {
        self.perf_enabled = enabled;
        self
    }

    /// Cycles in one trial
    pub fn cycles_per_trial(&self) -> usize {
        self.cycles_per_quarter * self.quarters
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.cycles_per_quarter == 0 {
            return Err(DeepError::invalid_parameter(
                "cycles_per_quarter",
                self.cycles_per_quarter.to_string(),
                "> 0",
            ));
        }
        if !(1..=4).contains(&self.quarters) {
            return Err(DeepError::invalid_parameter(
                "quarters",
                self.quarters.to_string(),
                "in 1..=4",
            ));
        }
        if !(0.0..=1.0).contains(&self.decay) {
            return Err(DeepError::invalid_parameter("decay", self.decay.to_string(), "in [0, 1]"));
        }
        if let Some(var) = self.record_vars.iter().find(|v| !ALL_NEURON_VARS.contains(&v.as_str())) {
            return Err(DeepError::unknown_variable(var.as_str()));
        }
        Ok(())
    }
}

/// External clamp applied to one layer for a trial
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialInput {
    /// Layer name
    pub layer: String,
    /// One value per unit
    pub values: Vec<f32>,
}

impl TrialInput {
    /// Clamp `layer` to `values`
    pub fn new(layer: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            layer: layer.into(),
            values,
        }
    }
}

/// Values of one variable across a layer
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerSnapshot {
    /// Layer name
    pub layer: String,
    /// Variable name
    pub var: String,
    /// One value per unit
    pub values: Vec<f32>,
}

/// State recorded at the end of a trial
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialRecord {
    /// Trial counter
    pub trial: usize,
    /// Requested variables per layer
    pub snapshots: Vec<LayerSnapshot>,
    /// Sends during this trial
    pub stats: SendStats,
}

impl TrialRecord {
    /// Recorded values of a variable in a layer
    pub fn values(&self, layer: &str, var: &str) -> Option<&[f32]> {
        self.snapshots
            .iter()
            .find(|s| s.layer == layer && s.var == var)
            .map(|s| s.values.as_slice())
    }
}

/// Performance metrics collected during simulation cycles.
/// Present when `SimulationParams::with_perf(true)` is used.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerfReport {
    /// Average cycle time in nanoseconds
    pub avg_cycle_ns: u64,
    /// Max cycle time in nanoseconds
    pub max_cycle_ns: u64,
    /// Cycles sampled
    pub cycles: usize,
}

/// Running totals of cycle timings
#[derive(Debug, Clone, Copy, Default)]
struct PerfAccum {
    cycles: usize,
    total_ns: u128,
    max_ns: u64,
}

impl PerfAccum {
    fn record(&mut self, ns: u64) {
        self.cycles += 1;
        self.total_ns += u128::from(ns);
        self.max_ns = self.max_ns.max(ns);
    }

    fn report(&self) -> Option<PerfReport> {
        if self.cycles == 0 {
            return None;
        }
        Some(PerfReport {
            avg_cycle_ns: u64::try_from(self.total_ns / self.cycles as u128).unwrap_or(u64::MAX),
            max_cycle_ns: self.max_ns,
            cycles: self.cycles,
        })
    }
}

/// Simulation results
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationResult {
    /// One record per trial
    pub trials: Vec<TrialRecord>,
    /// Cycles executed
    pub cycles_executed: u64,
    /// Sends over the whole run
    pub stats: SendStats,
    /// Optional performance report
    pub perf: Option<PerfReport>,
}

/// Simulation engine
#[derive(Debug)]
pub struct SimulationEngine {
    network: Network,
    params: SimulationParams,
    /// Clamps per trial, reused cyclically
    inputs: Vec<Vec<TrialInput>>,
    time: CycleTime,
    perf: PerfAccum,
}

impl SimulationEngine {
    /// Create a new simulation engine
    pub fn new(network: Network, params: SimulationParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            network,
            params,
            inputs: Vec::new(),
            time: CycleTime::new(),
            perf: PerfAccum::default(),
        })
    }

    /// Append the clamps of the next input pattern
    pub fn add_trial_inputs(&mut self, inputs: Vec<TrialInput>) -> Result<()> {
        for input in &inputs {
            let ly = self.network.layer_by_name(&input.layer)?;
            if input.values.len() != ly.num_units() {
                return Err(DeepError::invalid_parameter(
                    format!("{}.ext", input.layer),
                    format!("{} values", input.values.len()),
                    format!("{} values", ly.num_units()),
                ));
            }
        }
        self.inputs.push(inputs);
        Ok(())
    }

    /// Run the complete simulation
    pub fn run(&mut self) -> Result<SimulationResult> {
        log::info!(
            "Starting simulation: {} trials of {} quarters x {} cycles",
            self.params.trials,
            self.params.quarters,
            self.params.cycles_per_quarter
        );

        self.network.init_acts();
        self.network.reset_stats();
        self.time = CycleTime::new();
        self.perf = PerfAccum::default();

        let mut result = SimulationResult::default();
        for trial in 0..self.params.trials {
            let record = self.run_trial(trial)?;
            log::debug!(
                "Trial {} complete: {} act sends, {} burst sends, {} context sends",
                trial,
                record.stats.act.sends,
                record.stats.trc_burst.sends,
                record.stats.ctxt
            );
            result.trials.push(record);
        }

        result.cycles_executed = self.time.cycle_tot;
        result.stats = self.network.send_stats();
        if self.params.perf_enabled {
            result.perf = self.perf.report();
        }

        log::info!(
            "Simulation completed: {} cycles, {} act sends, {} unsends",
            result.cycles_executed,
            result.stats.act.sends,
            result.stats.act.unsends
        );
        Ok(result)
    }

    fn run_trial(&mut self, trial: usize) -> Result<TrialRecord> {
        let before = self.network.send_stats();
        self.time.trial_start(trial);

        self.network.decay_state(self.params.decay);
        self.network.clear_ext();
        if !self.inputs.is_empty() {
            for input in &self.inputs[trial % self.inputs.len()] {
                self.network.apply_ext(&input.layer, &input.values)?;
            }
        }
        self.network.trial_start();

        for quarter in 0..self.params.quarters {
            for _ in 0..self.params.cycles_per_quarter {
                let start = self.params.perf_enabled.then(Instant::now);
                self.network.cycle(quarter);
                if let Some(start) = start {
                    let ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
                    self.perf.record(ns);
                }
                self.time.cycle_inc();
            }
            self.network.quarter_final(quarter);
            self.time.quarter_inc();
        }

        let after = self.network.send_stats();
        Ok(TrialRecord {
            trial,
            snapshots: self.snapshot()?,
            stats: after.since(&before),
        })
    }

    fn snapshot(&self) -> Result<Vec<LayerSnapshot>> {
        let mut snaps = Vec::with_capacity(self.network.num_layers() * self.params.record_vars.len());
        for ly in self.network.layers() {
            for var in &self.params.record_vars {
                snaps.push(LayerSnapshot {
                    layer: ly.name().to_string(),
                    var: var.clone(),
                    values: ly.unit_vals(var)?,
                });
            }
        }
        Ok(snaps)
    }

    /// Get reference to network
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Get mutable reference to network
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Get simulation parameters
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Current position in the run
    pub fn time(&self) -> CycleTime {
        self.time
    }
}

/// Run `params.trials` trials, cycling through the given input patterns
pub fn run_trials(
    network: Network,
    params: SimulationParams,
    inputs: Vec<Vec<TrialInput>>,
) -> Result<SimulationResult> {
    let mut engine = SimulationEngine::new(network, params)?;
    for pattern in inputs {
        engine.add_trial_inputs(pattern)?;
    }
    engine.run()
}
