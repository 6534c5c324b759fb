//! Base rate-coded layers and their deep extension
//!
//! [`Layer`] is the plain rate-coded layer. [`DeepLayer`] owns a `Layer` and
//! adds the deep unit state, the role-specific parameter bundles and the
//! burst / attention / context / thalamic relay signal paths. Both implement
//! [`LayerOps`], the surface used by network assembly and tooling.

use crate::{
    error::*,
    neuron::{DeepNeuron, DeepNeurons, Neuron, ALL_NEURON_VARS, NEURON_VARS},
    params::{ActParams, DeepAttnParams, DeepBurstParams, DeepCtxtParams, DeepTrcParams, OptThreshParams},
    projection::{Inbox, Projection},
    propagate::{self, DeltaSink, SweepStats},
    role::LayerRole,
    shape::Shape,
    PrjnId,
};

/// Operations shared by base and deep layers
pub trait LayerOps {
    /// Layer name
    fn name(&self) -> &str;

    /// Layer shape
    fn shape(&self) -> &Shape;

    /// Number of units
    fn num_units(&self) -> usize {
        self.shape().len()
    }

    /// Allocate unit state. Must run after the layer is fully configured.
    fn build(&mut self) -> Result<()>;

    /// Full reset of all unit state
    fn init_acts(&mut self);

    /// Partial decay of state between trials
    fn decay_state(&mut self, decay: f32);

    /// Names of all variables available on units of this layer
    fn unit_var_names(&self) -> &'static [&'static str];

    /// Values of a variable across all units
    fn unit_vals(&self, var: &str) -> Result<Vec<f32>>;

    /// Value of a variable at an n-dimensional unit index
    fn unit_val(&self, var: &str, idx: &[usize]) -> Result<f32>;

    /// Value of a variable at a flat unit index
    fn unit_val_1d(&self, var: &str, idx: usize) -> Result<f32>;
}

/// Plain rate-coded layer
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    shape: Shape,
    /// Activation parameters
    pub act: ActParams,
    /// Delta send thresholds
    pub opt_thresh: OptThreshParams,
    pub(crate) neurons: Vec<Neuron>,
    clamped: bool,
}

impl Layer {
    /// Create an unbuilt layer
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            act: ActParams::default(),
            opt_thresh: OptThreshParams::default(),
            neurons: Vec::new(),
            clamped: false,
        }
    }

    /// Set activation parameters
    pub fn with_act_params(mut self, act: ActParams) -> Self {
        self.act = act;
        self
    }

    /// Set delta send thresholds
    pub fn with_opt_thresh(mut self, opt_thresh: OptThreshParams) -> Self {
        self.opt_thresh = opt_thresh;
        self
    }

    /// True once unit state is allocated
    pub fn is_built(&self) -> bool {
        !self.neurons.is_empty()
    }

    /// Unit state
    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Unit state, mutable
    pub fn neurons_mut(&mut self) -> &mut [Neuron] {
        &mut self.neurons
    }

    /// Clamp activations to external values
    pub fn apply_ext(&mut self, ext: &[f32]) -> Result<()> {
        if ext.len() != self.neurons.len() {
            return Err(DeepError::invalid_parameter(
                format!("{}.ext", self.name),
                format!("{} values", ext.len()),
                format!("{} values", self.neurons.len()),
            ));
        }
        for (nrn, &v) in self.neurons.iter_mut().zip(ext) {
            nrn.ext = v;
        }
        self.clamped = true;
        Ok(())
    }

    /// Release the external clamp
    pub fn clear_ext(&mut self) {
        for nrn in &mut self.neurons {
            nrn.ext = 0.0;
        }
        self.clamped = false;
    }

    /// True while activations are clamped to external values
    pub fn is_clamped(&self) -> bool {
        self.clamped
    }

    /// Zero the sent shadows and the raw input they built up
    pub fn init_g_inc(&mut self) {
        for nrn in &mut self.neurons {
            nrn.act_sent = 0.0;
            nrn.ge_raw = 0.0;
        }
    }

    /// Add this cycle's conductance increments and integrate conductance
    pub fn ge_fm_inc(&mut self, ge_inc: &[f32]) {
        let ge_dt = self.act.ge_dt;
        for (nrn, &inc) in self.neurons.iter_mut().zip(ge_inc) {
            nrn.ge_raw += inc;
            nrn.ge += ge_dt * (nrn.ge_raw - nrn.ge);
        }
    }

    /// Update activations from conductances (or the clamp)
    pub fn act_fm_g(&mut self) {
        let act = self.act;
        let clamped = self.clamped;
        for nrn in &mut self.neurons {
            if clamped {
                nrn.act = nrn.ext;
            } else {
                nrn.act += act.dt_integ * (act.act_fm_ge(nrn.ge) - nrn.act);
            }
        }
    }

    /// Maximum activation across units
    pub fn act_max(&self) -> f32 {
        self.neurons.iter().map(|n| n.act).fold(0.0, f32::max)
    }

    /// Record start-of-trial activation
    pub fn trial_start(&mut self) {
        for nrn in &mut self.neurons {
            nrn.act_q0 = nrn.act;
        }
    }

    /// Record phase activations at the end of a quarter (0-based)
    pub fn quarter_final(&mut self, quarter: usize) {
        for nrn in &mut self.neurons {
            match quarter {
                2 => nrn.act_m = nrn.act,
                3 => nrn.act_p = nrn.act,
                _ => {}
            }
        }
    }

    fn out_of_range(&self, idx: usize) -> DeepError {
        DeepError::IndexOutOfRange {
            index: idx,
            len: self.neurons.len(),
        }
    }
}

impl LayerOps for Layer {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn build(&mut self) -> Result<()> {
        if self.shape.num_dims() == 0 {
            return Err(DeepError::build_failure(&self.name, "shape has no dimensions"));
        }
        if self.shape.is_empty() {
            return Err(DeepError::build_failure(
                &self.name,
                format!("shape {} has no units", self.shape),
            ));
        }
        self.act
            .validate()
            .and_then(|_| self.opt_thresh.validate())
            .map_err(|e| DeepError::build_failure(&self.name, e.to_string()))?;

        self.neurons = vec![Neuron::default(); self.shape.len()];
        self.clamped = false;
        log::debug!("Built layer {} with {} units", self.name, self.neurons.len());
        Ok(())
    }

    fn init_acts(&mut self) {
        for nrn in &mut self.neurons {
            *nrn = Neuron::default();
        }
        self.clamped = false;
    }

    fn decay_state(&mut self, decay: f32) {
        for nrn in &mut self.neurons {
            nrn.decay(decay);
        }
    }

    fn unit_var_names(&self) -> &'static [&'static str] {
        &NEURON_VARS
    }

    fn unit_vals(&self, var: &str) -> Result<Vec<f32>> {
        let vidx = Neuron::var_index(var).ok_or_else(|| DeepError::unknown_variable(var))?;
        Ok(self.neurons.iter().map(|n| n.var_by_index(vidx)).collect())
    }

    fn unit_val(&self, var: &str, idx: &[usize]) -> Result<f32> {
        let off = self
            .shape
            .checked_offset(idx)
            .ok_or_else(|| self.out_of_range(usize::MAX))?;
        self.unit_val_1d(var, off)
    }

    fn unit_val_1d(&self, var: &str, idx: usize) -> Result<f32> {
        let nrn = self.neurons.get(idx).ok_or_else(|| self.out_of_range(idx))?;
        nrn.var_by_name(var)
    }
}

/// Rate-coded layer extended with deep state and a functional role
#[derive(Debug, Clone)]
pub struct DeepLayer {
    base: Layer,
    role: LayerRole,
    /// Burst computation parameters
    pub deep_burst: DeepBurstParams,
    /// Context integration parameters
    pub deep_ctxt: DeepCtxtParams,
    /// Thalamic relay drive parameters
    pub deep_trc: DeepTrcParams,
    /// Attention parameters
    pub deep_attn: DeepAttnParams,
    pub(crate) deep_neurs: DeepNeurons,
    pub(crate) send_prjns: Vec<PrjnId>,
    pub(crate) recv_prjns: Vec<PrjnId>,
}

impl DeepLayer {
    /// Create an unbuilt deep layer
    pub fn new(name: impl Into<String>, role: LayerRole, shape: Shape) -> Self {
        Self::from_base(Layer::new(name, shape), role)
    }

    /// Extend an existing base layer
    pub fn from_base(base: Layer, role: LayerRole) -> Self {
        Self {
            base,
            role,
            deep_burst: DeepBurstParams::default(),
            deep_ctxt: DeepCtxtParams::default(),
            deep_trc: DeepTrcParams::default(),
            deep_attn: DeepAttnParams::default(),
            deep_neurs: DeepNeurons::new(),
            send_prjns: Vec::new(),
            recv_prjns: Vec::new(),
        }
    }

    /// Functional role
    pub fn role(&self) -> LayerRole {
        self.role
    }

    /// Base layer
    pub fn base(&self) -> &Layer {
        &self.base
    }

    /// Base layer, mutable
    pub fn base_mut(&mut self) -> &mut Layer {
        &mut self.base
    }

    /// Deep unit state
    pub fn deep_neurons(&self) -> &DeepNeurons {
        &self.deep_neurs
    }

    /// Outgoing projections
    pub fn send_prjns(&self) -> &[PrjnId] {
        &self.send_prjns
    }

    /// Incoming projections
    pub fn recv_prjns(&self) -> &[PrjnId] {
        &self.recv_prjns
    }

    /// Send activation changes over standard and attention projections
    pub fn send_ge_delta<S: DeltaSink>(&mut self, prjns: &[Projection], sink: &mut S) -> SweepStats {
        propagate::sweep(
            &mut self.base.neurons,
            act_field,
            &self.base.opt_thresh,
            &self.send_prjns,
            prjns,
            propagate::route_act,
            sink,
        )
    }

    /// Send burst changes over thalamic burst projections
    pub fn send_trc_burst_ge_delta<S: DeltaSink>(
        &mut self,
        prjns: &[Projection],
        sink: &mut S,
    ) -> SweepStats {
        propagate::sweep(
            self.deep_neurs.as_mut_slice(),
            burst_field,
            &self.base.opt_thresh,
            &self.send_prjns,
            prjns,
            propagate::route_trc_burst,
            sink,
        )
    }

    /// Send current burst values over context projections
    pub fn send_ctxt_ge<S: DeltaSink>(&self, prjns: &[Projection], sink: &mut S) -> u64 {
        propagate::send_absolute(
            self.deep_neurs.as_slice(),
            |dn: &DeepNeuron| dn.deep_burst,
            &self.base.opt_thresh,
            &self.send_prjns,
            prjns,
            propagate::route_ctxt,
            sink,
        )
    }

    /// Merge this cycle's received increments into the layer's inputs
    pub fn recv_fm_inbox(&mut self, inbox: &Inbox) {
        self.base.ge_fm_inc(&inbox.ge_inc);
        for (i, dn) in self.deep_neurs.iter_mut().enumerate() {
            dn.trc_burst_ge += inbox.trc_burst_ge_inc[i];
            dn.attn_ge += inbox.attn_ge_inc[i];
        }
    }

    /// Update activations and the role-specific signals for one cycle
    pub fn act_fm_g(&mut self, quarter: usize) {
        if self.role == LayerRole::ThalamicRelay && self.deep_burst.is_burst_qtr(quarter) {
            self.trc_ge_fm_burst();
        }
        self.base.act_fm_g();
        if self.role == LayerRole::Superficial {
            self.attn_fm_ge();
            if self.deep_burst.on && self.deep_burst.is_burst_qtr(quarter) {
                self.burst_fm_act();
            }
        }
    }

    /// Outcome phase of a relay layer: burst drive replaces the predicted input
    fn trc_ge_fm_burst(&mut self) {
        let trc = self.deep_trc;
        for (nrn, dn) in self.base.neurons.iter_mut().zip(self.deep_neurs.iter()) {
            nrn.ge = trc.burst_ge(dn.trc_burst_ge);
        }
    }

    /// Attentional gain from attention conductance, applied to activation
    fn attn_fm_ge(&mut self) {
        let attn = self.deep_attn;
        let max_ge = self.deep_neurs.iter().map(|dn| dn.attn_ge).fold(0.0, f32::max);
        for (nrn, dn) in self.base.neurons.iter_mut().zip(self.deep_neurs.iter_mut()) {
            dn.act_no_attn = nrn.act;
            dn.deep_attn = if attn.on { attn.attn_fm_ge(dn.attn_ge, max_ge) } else { 1.0 };
            dn.deep_lrn = dn.deep_attn;
            nrn.act *= dn.deep_attn;
        }
    }

    /// Thresholded burst from (pre-attention) activation
    fn burst_fm_act(&mut self) {
        let burst = self.deep_burst;
        let source = |nrn: &Neuron, dn: &DeepNeuron| {
            if burst.fm_act_no_attn {
                dn.act_no_attn
            } else {
                nrn.act
            }
        };
        let max_src = self
            .base
            .neurons
            .iter()
            .zip(self.deep_neurs.iter())
            .map(|(nrn, dn)| source(nrn, dn))
            .fold(0.0, f32::max);
        let thr = burst.effective_thr(max_src);
        for (nrn, dn) in self.base.neurons.iter().zip(self.deep_neurs.iter_mut()) {
            let src = source(nrn, &*dn);
            dn.deep_burst = if src > thr { src } else { 0.0 };
        }
    }

    /// Integrate context from the context input of this quarter
    pub fn ctxt_fm_ge(&mut self, inbox: &Inbox) {
        let ctxt = self.deep_ctxt;
        for (dn, &ge) in self.deep_neurs.iter_mut().zip(&inbox.ctxt_ge) {
            dn.deep_ctxt = ctxt.ctxt_fm_ge(dn.deep_ctxt, ge);
        }
    }

    /// End-of-quarter bookkeeping (0-based quarter)
    pub fn quarter_final(&mut self, quarter: usize) {
        self.base.quarter_final(quarter);
        if self.role == LayerRole::Superficial && self.deep_burst.is_burst_qtr(quarter) {
            for dn in self.deep_neurs.iter_mut() {
                dn.deep_burst_prv = dn.deep_burst;
            }
        }
    }

    /// Zero every sent shadow and the receiving inputs built from them
    pub fn init_g_inc(&mut self) {
        self.base.init_g_inc();
        for dn in self.deep_neurs.iter_mut() {
            dn.deep_burst_sent = 0.0;
            dn.trc_burst_ge = 0.0;
            dn.attn_ge = 0.0;
        }
    }

    fn validate_deep_params(&self) -> Result<()> {
        self.deep_burst.validate()?;
        self.deep_ctxt.validate()?;
        self.deep_trc.validate()?;
        self.deep_attn.validate()
    }
}

impl LayerOps for DeepLayer {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn shape(&self) -> &Shape {
        self.base.shape()
    }

    fn build(&mut self) -> Result<()> {
        self.base.build()?;
        self.validate_deep_params()
            .map_err(|e| DeepError::build_failure(self.base.name(), e.to_string()))?;
        self.deep_neurs.allocate(self.base.shape().len());
        Ok(())
    }

    fn init_acts(&mut self) {
        self.base.init_acts();
        self.deep_neurs.reset_all();
    }

    fn decay_state(&mut self, decay: f32) {
        self.base.decay_state(decay);
        self.deep_neurs.reset_transient();
    }

    fn unit_var_names(&self) -> &'static [&'static str] {
        &ALL_NEURON_VARS
    }

    fn unit_vals(&self, var: &str) -> Result<Vec<f32>> {
        if Neuron::var_index(var).is_some() {
            return self.base.unit_vals(var);
        }
        let vidx = DeepNeuron::var_index(var).ok_or_else(|| DeepError::unknown_variable(var))?;
        Ok(self.deep_neurs.iter().map(|dn| dn.var_by_index(vidx)).collect())
    }

    fn unit_val(&self, var: &str, idx: &[usize]) -> Result<f32> {
        if Neuron::var_index(var).is_some() {
            return self.base.unit_val(var, idx);
        }
        let off = self.base.shape().checked_offset(idx).ok_or(DeepError::IndexOutOfRange {
            index: usize::MAX,
            len: self.deep_neurs.len(),
        })?;
        self.unit_val_1d(var, off)
    }

    fn unit_val_1d(&self, var: &str, idx: usize) -> Result<f32> {
        if Neuron::var_index(var).is_some() {
            return self.base.unit_val_1d(var, idx);
        }
        let dn = self.deep_neurs.get(idx).ok_or(DeepError::IndexOutOfRange {
            index: idx,
            len: self.deep_neurs.len(),
        })?;
        dn.var_by_name(var)
    }
}

fn act_field(nrn: &mut Neuron) -> (f32, &mut f32) {
    (nrn.act, &mut nrn.act_sent)
}

fn burst_field(dn: &mut DeepNeuron) -> (f32, &mut f32) {
    (dn.deep_burst, &mut dn.deep_burst_sent)
}
