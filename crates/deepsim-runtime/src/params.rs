//! Parameter bundles for base and deep layers

use crate::error::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Thresholds for the delta-based sending optimization
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct OptThreshParams {
    /// Don't send activation when below this value
    pub send: f32,
    /// Don't send activation changes until they exceed this magnitude
    pub delta: f32,
}

impl Default for OptThreshParams {
    fn default() -> Self {
        Self {
            send: 0.1,
            delta: 0.005,
        }
    }
}

impl OptThreshParams {
    /// Create new thresholds with validation
    pub fn new(send: f32, delta: f32) -> Result<Self> {
        let params = Self { send, delta };
        params.validate()?;
        Ok(params)
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.send >= 0.0) {
            return Err(DeepError::invalid_parameter(
                "opt_thresh.send",
                self.send.to_string(),
                ">= 0.0",
            ));
        }
        if !(self.delta >= 0.0) {
            return Err(DeepError::invalid_parameter(
                "opt_thresh.delta",
                self.delta.to_string(),
                ">= 0.0",
            ));
        }
        Ok(())
    }
}

/// Rate-coded activation parameters of the base layer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ActParams {
    /// Gain of the noisy-X-over-X-plus-1 activation function
    pub gain: f32,
    /// Excitatory conductance threshold for activation
    pub thr: f32,
    /// Integration rate of activation toward its target value
    pub dt_integ: f32,
    /// Integration rate of excitatory conductance toward the raw input
    pub ge_dt: f32,
    /// Maximal excitatory conductance
    pub gbar_e: f32,
}

impl Default for ActParams {
    fn default() -> Self {
        Self {
            gain: 100.0,
            thr: 0.5,
            dt_integ: 1.0,
            ge_dt: 1.0,
            gbar_e: 1.0,
        }
    }
}

impl ActParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.gain <= 0.0 {
            return Err(DeepError::invalid_parameter("act.gain", self.gain.to_string(), "> 0.0"));
        }
        if !(self.dt_integ > 0.0 && self.dt_integ <= 1.0) {
            return Err(DeepError::invalid_parameter(
                "act.dt_integ",
                self.dt_integ.to_string(),
                "in (0, 1]",
            ));
        }
        if !(self.ge_dt > 0.0 && self.ge_dt <= 1.0) {
            return Err(DeepError::invalid_parameter(
                "act.ge_dt",
                self.ge_dt.to_string(),
                "in (0, 1]",
            ));
        }
        if self.gbar_e < 0.0 {
            return Err(DeepError::invalid_parameter(
                "act.gbar_e",
                self.gbar_e.to_string(),
                ">= 0.0",
            ));
        }
        Ok(())
    }

    /// Steady-state activation for a given excitatory conductance
    pub fn act_fm_ge(&self, ge: f32) -> f32 {
        let x = self.gain * (ge * self.gbar_e - self.thr);
        if x <= 0.0 {
            0.0
        } else {
            x / (x + 1.0)
        }
    }
}

/// Bit mask over the four quarters of a trial
pub type QuarterMask = u8;

/// Mask selecting only the final (plus-phase) quarter
pub const Q4: QuarterMask = 0b1000;

/// Parameters for computing the burst signal from activation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DeepBurstParams {
    /// Compute burst at all
    pub on: bool,
    /// Quarters during which burst is computed and sent
    pub burst_qtr: QuarterMask,
    /// Use activation before attentional modulation as the burst source
    pub fm_act_no_attn: bool,
    /// Threshold relative to the layer maximum of the source activation
    pub thr_rel: f32,
    /// Absolute threshold on the source activation
    pub thr_abs: f32,
}

impl Default for DeepBurstParams {
    fn default() -> Self {
        Self {
            on: true,
            burst_qtr: Q4,
            fm_act_no_attn: true,
            thr_rel: 0.1,
            thr_abs: 0.1,
        }
    }
}

impl DeepBurstParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.burst_qtr > 0b1111 {
            return Err(DeepError::invalid_parameter(
                "deep_burst.burst_qtr",
                format!("{:#b}", self.burst_qtr),
                "a mask over four quarters",
            ));
        }
        if !(0.0..=1.0).contains(&self.thr_rel) {
            return Err(DeepError::invalid_parameter(
                "deep_burst.thr_rel",
                self.thr_rel.to_string(),
                "in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.thr_abs) {
            return Err(DeepError::invalid_parameter(
                "deep_burst.thr_abs",
                self.thr_abs.to_string(),
                "in [0, 1]",
            ));
        }
        Ok(())
    }

    /// True if burst is active during the given quarter (0-based)
    pub fn is_burst_qtr(&self, quarter: usize) -> bool {
        quarter < 4 && self.burst_qtr & (1 << quarter) != 0
    }

    /// True if the given quarter is the one right before a burst quarter
    pub fn is_next_burst_qtr(&self, quarter: usize) -> bool {
        self.is_burst_qtr((quarter + 1) % 4)
    }

    /// Effective threshold given the layer maximum of the source activation
    pub fn effective_thr(&self, max_act: f32) -> f32 {
        (self.thr_rel * max_act).max(self.thr_abs)
    }
}

/// Parameters for integrating the context signal in deep layers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DeepCtxtParams {
    /// Fraction of the prior context retained on each update
    pub fm_prv: f32,
}

impl DeepCtxtParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fm_prv) {
            return Err(DeepError::invalid_parameter(
                "deep_ctxt.fm_prv",
                self.fm_prv.to_string(),
                "in [0, 1]",
            ));
        }
        Ok(())
    }

    /// Weight on the newly arrived context input
    pub fn fm_new(&self) -> f32 {
        1.0 - self.fm_prv
    }

    /// Integrated context from the prior value and the new context input
    pub fn ctxt_fm_ge(&self, prev: f32, ctxt_ge: f32) -> f32 {
        self.fm_prv * prev + self.fm_new() * ctxt_ge
    }
}

/// Parameters for the thalamic relay outcome drive
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DeepTrcParams {
    /// Turn the burst drive into a binary on/off value
    pub binarize: bool,
    /// Threshold for binarizing
    pub bin_thr: f32,
    /// Drive value when above threshold
    pub bin_on: f32,
    /// Drive value when below threshold
    pub bin_off: f32,
}

impl Default for DeepTrcParams {
    fn default() -> Self {
        Self {
            binarize: false,
            bin_thr: 0.4,
            bin_on: 0.3,
            bin_off: 0.0,
        }
    }
}

impl DeepTrcParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.bin_on < self.bin_off {
            return Err(DeepError::invalid_parameter(
                "deep_trc.bin_on",
                format!("{} (with bin_off={})", self.bin_on, self.bin_off),
                ">= bin_off",
            ));
        }
        Ok(())
    }

    /// Excitatory drive derived from the thalamic burst conductance
    pub fn burst_ge(&self, burst_ge: f32) -> f32 {
        if !self.binarize {
            return burst_ge;
        }
        if burst_ge >= self.bin_thr {
            self.bin_on
        } else {
            self.bin_off
        }
    }
}

/// Parameters for attentional modulation of superficial activation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DeepAttnParams {
    /// Apply attentional modulation at all
    pub on: bool,
    /// Minimum attention gain
    pub min: f32,
    /// Layer maximum attention conductance below which no modulation applies
    pub thr: f32,
}

impl Default for DeepAttnParams {
    fn default() -> Self {
        Self {
            on: true,
            min: 0.8,
            thr: 0.1,
        }
    }
}

impl DeepAttnParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min) {
            return Err(DeepError::invalid_parameter(
                "deep_attn.min",
                self.min.to_string(),
                "in [0, 1]",
            ));
        }
        if self.thr < 0.0 {
            return Err(DeepError::invalid_parameter(
                "deep_attn.thr",
                self.thr.to_string(),
                ">= 0.0",
            ));
        }
        Ok(())
    }

    /// Attention gain given a unit's conductance and the layer maximum
    pub fn attn_fm_ge(&self, attn_ge: f32, max_ge: f32) -> f32 {
        if max_ge <= self.thr {
            return 1.0;
        }
        self.min + (1.0 - self.min) * (attn_ge / max_ge).clamp(0.0, 1.0)
    }
}
