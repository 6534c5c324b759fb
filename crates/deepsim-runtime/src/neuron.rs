//! Per-unit state records for base and deep layers

use crate::error::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Variable names of the base rate-coded neuron, in index order
pub const NEURON_VARS: [&str; 8] = ["Act", "ActSent", "Ge", "GeRaw", "Ext", "ActQ0", "ActM", "ActP"];

/// Variable names of the deep extension, in index order
pub const DEEP_NEURON_VARS: [&str; 9] = [
    "ActNoAttn",
    "DeepBurst",
    "DeepBurstPrv",
    "DeepCtxt",
    "TRCBurstGe",
    "DeepBurstSent",
    "AttnGe",
    "DeepAttn",
    "DeepLrn",
];

/// Base variables followed by the deep variables
pub const ALL_NEURON_VARS: [&str; 17] = [
    "Act",
    "ActSent",
    "Ge",
    "GeRaw",
    "Ext",
    "ActQ0",
    "ActM",
    "ActP",
    "ActNoAttn",
    "DeepBurst",
    "DeepBurstPrv",
    "DeepCtxt",
    "TRCBurstGe",
    "DeepBurstSent",
    "AttnGe",
    "DeepAttn",
    "DeepLrn",
];

/// Base rate-coded unit state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neuron {
    /// Rate-coded activation
    pub act: f32,
    /// Last activation value sent on the standard channels
    pub act_sent: f32,
    /// Integrated excitatory conductance
    pub ge: f32,
    /// Raw excitatory input accumulated from senders
    pub ge_raw: f32,
    /// External clamp value
    pub ext: f32,
    /// Activation at the start of the trial
    pub act_q0: f32,
    /// Activation at the end of the minus phase
    pub act_m: f32,
    /// Activation at the end of the plus phase
    pub act_p: f32,
}

impl Neuron {
    /// Index of a base variable name
    pub fn var_index(name: &str) -> Option<usize> {
        NEURON_VARS.iter().position(|v| *v == name)
    }

    /// Value of the variable at the given index
    pub fn var_by_index(&self, idx: usize) -> f32 {
        match idx {
            0 => self.act,
            1 => self.act_sent,
            2 => self.ge,
            3 => self.ge_raw,
            4 => self.ext,
            5 => self.act_q0,
            6 => self.act_m,
            7 => self.act_p,
            _ => f32::NAN,
        }
    }

    /// Value of the named variable
    pub fn var_by_name(&self, name: &str) -> Result<f32> {
        Self::var_index(name)
            .map(|idx| self.var_by_index(idx))
            .ok_or_else(|| DeepError::unknown_variable(name))
    }

    /// Partially decay activation state toward zero and forget the sent value
    pub fn decay(&mut self, decay: f32) {
        self.act -= decay * self.act;
        self.ge -= decay * self.ge;
        self.act_sent = 0.0;
    }
}

/// Deep-layer extension of the unit state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeepNeuron {
    /// Activation before attentional modulation
    pub act_no_attn: f32,
    /// Thresholded superficial activation broadcast to deep and relay layers
    pub deep_burst: f32,
    /// Burst value from the previous burst quarter
    pub deep_burst_prv: f32,
    /// Temporally integrated context from superficial burst senders
    pub deep_ctxt: f32,
    /// Excitatory drive accumulated from thalamic burst projections
    pub trc_burst_ge: f32,
    /// Last burst value sent on thalamic burst projections
    pub deep_burst_sent: f32,
    /// Excitatory drive accumulated from attention projections
    pub attn_ge: f32,
    /// Attentional gain on activation
    pub deep_attn: f32,
    /// Attentional modulation of learning
    pub deep_lrn: f32,
}

impl DeepNeuron {
    /// Index of a deep variable name
    pub fn var_index(name: &str) -> Option<usize> {
        DEEP_NEURON_VARS.iter().position(|v| *v == name)
    }

    /// Value of the variable at the given index
    pub fn var_by_index(&self, idx: usize) -> f32 {
        match idx {
            0 => self.act_no_attn,
            1 => self.deep_burst,
            2 => self.deep_burst_prv,
            3 => self.deep_ctxt,
            4 => self.trc_burst_ge,
            5 => self.deep_burst_sent,
            6 => self.attn_ge,
            7 => self.deep_attn,
            8 => self.deep_lrn,
            _ => f32::NAN,
        }
    }

    /// Value of the named variable
    pub fn var_by_name(&self, name: &str) -> Result<f32> {
        Self::var_index(name)
            .map(|idx| self.var_by_index(idx))
            .ok_or_else(|| DeepError::unknown_variable(name))
    }

    /// Zero every field
    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Zero the "last sent" shadows only
    pub fn reset_transient(&mut self) {
        self.deep_burst_sent = 0.0;
    }
}

/// Flat, index-addressed store of deep unit state for one layer
#[derive(Debug, Clone, Default)]
pub struct DeepNeurons {
    neurons: Vec<DeepNeuron>,
}

impl DeepNeurons {
    /// Empty store (unbuilt layer)
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store with `n` zero-valued records
    pub fn allocate(&mut self, n: usize) {
        self.neurons = vec![DeepNeuron::default(); n];
    }

    /// Zero the "last sent" shadows of every record
    pub fn reset_transient(&mut self) {
        for nrn in &mut self.neurons {
            nrn.reset_transient();
        }
    }

    /// Zero every field of every record
    pub fn reset_all(&mut self) {
        for nrn in &mut self.neurons {
            nrn.reset_all();
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    /// True if no records are allocated
    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    /// Record at a flat index
    pub fn get(&self, idx: usize) -> Option<&DeepNeuron> {
        self.neurons.get(idx)
    }

    /// All records
    pub fn as_slice(&self) -> &[DeepNeuron] {
        &self.neurons
    }

    /// All records, mutable
    pub fn as_mut_slice(&mut self) -> &mut [DeepNeuron] {
        &mut self.neurons
    }

    /// Iterate over records
    pub fn iter(&self) -> std::slice::Iter<'_, DeepNeuron> {
        self.neurons.iter()
    }

    /// Iterate mutably over records
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DeepNeuron> {
        self.neurons.iter_mut()
    }
}

impl std::ops::Index<usize> for DeepNeurons {
    type Output = DeepNeuron;

    fn index(&self, idx: usize) -> &DeepNeuron {
        &self.neurons[idx]
    }
}

impl std::ops::IndexMut<usize> for DeepNeurons {
    fn index_mut(&mut self, idx: usize) -> &mut DeepNeuron {
        &mut self.neurons[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn busy_neuron() -> DeepNeuron {
        DeepNeuron {
            act_no_attn: 0.4,
            deep_burst: 0.6,
            deep_burst_prv: 0.5,
            deep_ctxt: 0.3,
            trc_burst_ge: 0.2,
            deep_burst_sent: 0.6,
            attn_ge: 0.1,
            deep_attn: 0.9,
            deep_lrn: 0.9,
        }
    }

    #[test]
    fn test_var_lookup() {
        let nrn = busy_neuron();
        for (i, name) in DEEP_NEURON_VARS.iter().enumerate() {
            assert_eq!(DeepNeuron::var_index(name), Some(i));
            assert_eq!(nrn.var_by_name(name).unwrap(), nrn.var_by_index(i));
        }
        assert_eq!(nrn.var_by_name("DeepBurst").unwrap(), 0.6);
        assert!(matches!(
            nrn.var_by_name("Act"),
            Err(DeepError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_all_vars_concatenate() {
        let joined: Vec<&str> = NEURON_VARS.iter().chain(DEEP_NEURON_VARS.iter()).copied().collect();
        assert_eq!(joined, ALL_NEURON_VARS.to_vec());
    }

    #[test]
    fn test_base_var_lookup() {
        let nrn = Neuron { act: 0.7, act_sent: 0.65, ..Default::default() };
        assert_eq!(nrn.var_by_name("Act").unwrap(), 0.7);
        assert_eq!(nrn.var_by_name("ActSent").unwrap(), 0.65);
        assert!(nrn.var_by_name("DeepBurst").is_err());
    }

    #[test]
    fn test_store_resets() {
        let mut store = DeepNeurons::new();
        assert!(store.is_empty());
        store.allocate(3);
        assert_eq!(store.len(), 3);
        assert!(store.iter().all(|n| *n == DeepNeuron::default()));

        for nrn in store.iter_mut() {
            *nrn = busy_neuron();
        }
        store.reset_transient();
        for nrn in store.iter() {
            assert_eq!(nrn.deep_burst_sent, 0.0);
            assert_eq!(nrn.deep_burst, 0.6);
            assert_eq!(nrn.deep_ctxt, 0.3);
        }

        store.reset_all();
        assert!(store.iter().all(|n| *n == DeepNeuron::default()));
    }

    #[test]
    fn test_allocate_replaces() {
        let mut store = DeepNeurons::new();
        store.allocate(2);
        store[1] = busy_neuron();
        store.allocate(4);
        assert_eq!(store.len(), 4);
        assert_eq!(store[1], DeepNeuron::default());
    }

    #[test]
    fn test_base_decay() {
        let mut nrn = Neuron { act: 0.8, act_sent: 0.8, ge: 0.6, ge_raw: 0.4, ..Default::default() };
        nrn.decay(0.5);
        assert!((nrn.act - 0.4).abs() < 1e-6);
        assert!((nrn.ge - 0.3).abs() < 1e-6);
        assert_eq!(nrn.act_sent, 0.0);
        // raw input is owned by the senders' bookkeeping
        assert_eq!(nrn.ge_raw, 0.4);
    }
}
