//! Typed projections between layers
//!
//! A projection is a directed, typed bundle of connections from a sending
//! layer to a receiving layer. It holds no unit state: each send primitive
//! takes a sender unit index and a value, scales it through that unit's
//! outgoing weights and adds the result into the receiver's [`Inbox`].

use core::fmt;

use crate::{error::*, LayerId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of signal a projection carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum ProjectionKind {
    /// Ordinary excitatory activation
    #[default]
    Standard,
    /// Superficial burst into deep-layer context
    BurstCtxt,
    /// Superficial burst into thalamic relay outcome drive
    BurstTrc,
    /// Deep activation into superficial attention
    DeepAttn,
}

impl ProjectionKind {
    /// All kinds, in declaration order
    pub const ALL: [ProjectionKind; 4] = [
        Self::Standard,
        Self::BurstCtxt,
        Self::BurstTrc,
        Self::DeepAttn,
    ];

    /// Short label used in configuration files and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::BurstCtxt => "burst_ctxt",
            Self::BurstTrc => "burst_trc",
            Self::DeepAttn => "deep_attn",
        }
    }

    /// Parse a label produced by [`ProjectionKind::as_str`]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == label)
    }
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiving accumulator a send lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Standard excitatory conductance increment
    Ge,
    /// Context input of deep layers
    CtxtGe,
    /// Thalamic relay burst conductance increment
    TrcBurstGe,
    /// Attention conductance increment
    AttnGe,
}

/// Connectivity pattern between sending and receiving units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum Pattern {
    /// Every sender connects to every receiver
    #[default]
    Full,
    /// Sender i connects to receiver i; layers must be the same size
    OneToOne,
}

/// Per-receiver accumulation buffers for one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbox {
    /// Standard conductance increments
    pub ge_inc: Vec<f32>,
    /// Context input
    pub ctxt_ge: Vec<f32>,
    /// Thalamic burst conductance increments
    pub trc_burst_ge_inc: Vec<f32>,
    /// Attention conductance increments
    pub attn_ge_inc: Vec<f32>,
}

impl Inbox {
    /// Zeroed buffers for `n` receiving units
    pub fn new(n: usize) -> Self {
        Self {
            ge_inc: vec![0.0; n],
            ctxt_ge: vec![0.0; n],
            trc_burst_ge_inc: vec![0.0; n],
            attn_ge_inc: vec![0.0; n],
        }
    }

    /// Number of receiving units
    pub fn len(&self) -> usize {
        self.ge_inc.len()
    }

    /// True if sized for no units
    pub fn is_empty(&self) -> bool {
        self.ge_inc.is_empty()
    }

    /// Zero the per-cycle increments (context input is kept until consumed)
    pub fn reset(&mut self) {
        self.ge_inc.fill(0.0);
        self.trc_burst_ge_inc.fill(0.0);
        self.attn_ge_inc.fill(0.0);
    }

    /// Zero the context input
    pub fn reset_ctxt(&mut self) {
        self.ctxt_ge.fill(0.0);
    }

    /// Buffer backing the given channel
    pub fn channel_mut(&mut self, channel: Channel) -> &mut [f32] {
        match channel {
            Channel::Ge => &mut self.ge_inc,
            Channel::CtxtGe => &mut self.ctxt_ge,
            Channel::TrcBurstGe => &mut self.trc_burst_ge_inc,
            Channel::AttnGe => &mut self.attn_ge_inc,
        }
    }

    /// Buffer backing the given channel
    pub fn channel(&self, channel: Channel) -> &[f32] {
        match channel {
            Channel::Ge => &self.ge_inc,
            Channel::CtxtGe => &self.ctxt_ge,
            Channel::TrcBurstGe => &self.trc_burst_ge_inc,
            Channel::AttnGe => &self.attn_ge_inc,
        }
    }
}

/// Directed, typed projection from one layer to another
#[derive(Debug, Clone)]
pub struct Projection {
    /// Sending layer
    pub send: LayerId,
    /// Receiving layer
    pub recv: LayerId,
    kind: ProjectionKind,
    off: bool,
    pattern: Pattern,
    init_wt: f32,
    wt_scale: f32,
    /// Per sender: start offset into `recv_idx` / `wts` (len = senders + 1)
    con_start: Vec<usize>,
    recv_idx: Vec<usize>,
    wts: Vec<f32>,
}

impl Projection {
    /// Create an unbuilt projection with full connectivity and unit weights
    pub fn new(send: LayerId, recv: LayerId, kind: ProjectionKind) -> Self {
        Self {
            send,
            recv,
            kind,
            off: false,
            pattern: Pattern::Full,
            init_wt: 1.0,
            wt_scale: 1.0,
            con_start: Vec::new(),
            recv_idx: Vec::new(),
            wts: Vec::new(),
        }
    }

    /// Set the connectivity pattern
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Set the initial weight of every connection
    pub fn with_weight(mut self, wt: f32) -> Self {
        self.init_wt = wt;
        self
    }

    /// Set the absolute scaling applied to every value sent
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.wt_scale = scale;
        self
    }

    /// Start the projection disabled
    pub fn with_off(mut self, off: bool) -> Self {
        self.off = off;
        self
    }

    /// Allocate connections for the given layer sizes
    pub fn build(&mut self, n_send: usize, n_recv: usize) -> Result<()> {
        if !self.wt_scale.is_finite() || !self.init_wt.is_finite() {
            return Err(DeepError::invalid_parameter(
                "projection weight",
                format!("{} (scale {})", self.init_wt, self.wt_scale),
                "finite",
            ));
        }

        self.con_start.clear();
        self.recv_idx.clear();
        self.con_start.push(0);
        match self.pattern {
            Pattern::Full => {
                for _ in 0..n_send {
                    self.recv_idx.extend(0..n_recv);
                    self.con_start.push(self.recv_idx.len());
                }
            }
            Pattern::OneToOne => {
                if n_send != n_recv {
                    return Err(DeepError::network_topology(format!(
                        "one-to-one projection {} -> {} needs equal sizes, got {} and {}",
                        self.send, self.recv, n_send, n_recv
                    )));
                }
                for si in 0..n_send {
                    self.recv_idx.push(si);
                    self.con_start.push(self.recv_idx.len());
                }
            }
        }
        self.wts = vec![self.init_wt; self.recv_idx.len()];
        Ok(())
    }

    /// Channel type of this projection
    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    /// Connectivity pattern
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// True if the projection has been switched off
    pub fn is_off(&self) -> bool {
        self.off
    }

    /// True if the projection takes part in propagation
    pub fn is_enabled(&self) -> bool {
        !self.off
    }

    /// Switch the projection off or back on
    pub fn set_off(&mut self, off: bool) {
        self.off = off;
    }

    /// Absolute scaling applied to every value sent
    pub fn scale(&self) -> f32 {
        self.wt_scale
    }

    /// Number of sending units the projection was built for
    pub fn num_senders(&self) -> usize {
        self.con_start.len().saturating_sub(1)
    }

    /// Total number of connections
    pub fn num_cons(&self) -> usize {
        self.wts.len()
    }

    /// Outgoing connections of a sender as (receiver index, weight)
    pub fn send_cons(&self, si: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let range = match (self.con_start.get(si), self.con_start.get(si + 1)) {
            (Some(&st), Some(&ed)) => st..ed,
            _ => 0..0,
        };
        self.recv_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.wts[range].iter().copied())
    }

    /// Weight of the connection from sender `si` to receiver `ri`
    pub fn weight(&self, si: usize, ri: usize) -> Option<f32> {
        self.send_cons(si).find(|(r, _)| *r == ri).map(|(_, w)| w)
    }

    /// Set the weight of an existing connection
    pub fn set_weight(&mut self, si: usize, ri: usize, wt: f32) -> Result<()> {
        if si >= self.num_senders() {
            return Err(DeepError::IndexOutOfRange {
                index: si,
                len: self.num_senders(),
            });
        }
        let (st, ed) = (self.con_start[si], self.con_start[si + 1]);
        let ci = self.recv_idx[st..ed]
            .iter()
            .position(|&r| r == ri)
            .ok_or_else(|| {
                DeepError::network_topology(format!(
                    "no connection {} -> {} in projection {} -> {}",
                    si, ri, self.send, self.recv
                ))
            })?;
        self.wts[st + ci] = wt;
        Ok(())
    }

    fn deliver(&self, si: usize, value: f32, acc: &mut [f32]) {
        let scaled = value * self.wt_scale;
        for (ri, wt) in self.send_cons(si) {
            acc[ri] += scaled * wt;
        }
    }

    /// Send a change in activation into the standard conductance
    pub fn send_ge_delta(&self, si: usize, delta: f32, inbox: &mut Inbox) {
        self.deliver(si, delta, &mut inbox.ge_inc);
    }

    /// Send a burst value into the receiver's context input
    pub fn send_ctxt_ge(&self, si: usize, burst: f32, inbox: &mut Inbox) {
        self.deliver(si, burst, &mut inbox.ctxt_ge);
    }

    /// Send a change in burst into the thalamic relay conductance
    pub fn send_trc_burst_ge_delta(&self, si: usize, delta: f32, inbox: &mut Inbox) {
        self.deliver(si, delta, &mut inbox.trc_burst_ge_inc);
    }

    /// Send a change in activation into the attention conductance
    pub fn send_attn_ge_delta(&self, si: usize, delta: f32, inbox: &mut Inbox) {
        self.deliver(si, delta, &mut inbox.attn_ge_inc);
    }

    /// Send a value on the given channel
    pub fn send_on(&self, channel: Channel, si: usize, value: f32, inbox: &mut Inbox) {
        match channel {
            Channel::Ge => self.send_ge_delta(si, value, inbox),
            Channel::CtxtGe => self.send_ctxt_ge(si, value, inbox),
            Channel::TrcBurstGe => self.send_trc_burst_ge_delta(si, value, inbox),
            Channel::AttnGe => self.send_attn_ge_delta(si, value, inbox),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built(kind: ProjectionKind, pattern: Pattern, n_send: usize, n_recv: usize) -> Projection {
        let mut pj = Projection::new(LayerId::new(0), LayerId::new(1), kind).with_pattern(pattern);
        pj.build(n_send, n_recv).unwrap();
        pj
    }

    #[test]
    fn test_full_connectivity() {
        let pj = built(ProjectionKind::Standard, Pattern::Full, 2, 3);
        assert_eq!(pj.num_senders(), 2);
        assert_eq!(pj.num_cons(), 6);
        let cons: Vec<_> = pj.send_cons(1).collect();
        assert_eq!(cons, vec![(0, 1.0), (1, 1.0), (2, 1.0)]);
        assert_eq!(pj.send_cons(5).count(), 0);
    }

    #[test]
    fn test_one_to_one() {
        let pj = built(ProjectionKind::BurstTrc, Pattern::OneToOne, 3, 3);
        assert_eq!(pj.num_cons(), 3);
        assert_eq!(pj.send_cons(2).collect::<Vec<_>>(), vec![(2, 1.0)]);

        let mut bad = Projection::new(LayerId::new(0), LayerId::new(1), ProjectionKind::Standard)
            .with_pattern(Pattern::OneToOne);
        assert!(matches!(bad.build(3, 4), Err(DeepError::NetworkTopology { .. })));
    }

    #[test]
    fn test_primitives_hit_their_buffers() {
        let mut pj = built(ProjectionKind::Standard, Pattern::Full, 2, 2).with_scale(2.0);
        pj.set_weight(0, 1, 0.5).unwrap();
        let mut inbox = Inbox::new(2);

        pj.send_ge_delta(0, 0.1, &mut inbox);
        assert!((inbox.ge_inc[0] - 0.2).abs() < 1e-6);
        assert!((inbox.ge_inc[1] - 0.1).abs() < 1e-6);

        pj.send_attn_ge_delta(1, 0.25, &mut inbox);
        assert_eq!(inbox.attn_ge_inc, vec![0.5, 0.5]);

        pj.send_trc_burst_ge_delta(1, -0.25, &mut inbox);
        assert_eq!(inbox.trc_burst_ge_inc, vec![-0.5, -0.5]);

        pj.send_ctxt_ge(1, 0.5, &mut inbox);
        assert_eq!(inbox.ctxt_ge, vec![1.0, 1.0]);

        inbox.reset();
        assert_eq!(inbox.ge_inc, vec![0.0, 0.0]);
        assert_eq!(inbox.ctxt_ge, vec![1.0, 1.0]);
        inbox.reset_ctxt();
        assert_eq!(inbox.ctxt_ge, vec![0.0, 0.0]);
    }

    #[test]
    fn test_send_on_dispatch() {
        let pj = built(ProjectionKind::DeepAttn, Pattern::OneToOne, 1, 1);
        let channels = [Channel::Ge, Channel::CtxtGe, Channel::TrcBurstGe, Channel::AttnGe];
        for channel in channels {
            let mut inbox = Inbox::new(1);
            pj.send_on(channel, 0, 0.3, &mut inbox);
            for other in channels {
                let expect = if other == channel { 0.3 } else { 0.0 };
                assert_eq!(inbox.channel(other)[0], expect);
            }
        }
    }

    #[test]
    fn test_weights_and_off() {
        let mut pj = built(ProjectionKind::Standard, Pattern::Full, 2, 2);
        assert!(pj.is_enabled());
        pj.set_off(true);
        assert!(pj.is_off());
        pj.set_weight(1, 0, 0.3).unwrap();
        assert_eq!(pj.weight(1, 0), Some(0.3));
        assert_eq!(pj.weight(1, 5), None);
        assert!(pj.set_weight(4, 0, 0.1).is_err());
    }

    #[test]
    fn test_kind_labels() {
        for kind in ProjectionKind::ALL {
            assert_eq!(ProjectionKind::from_label(kind.as_str()), Some(kind));
        }
        assert_eq!(ProjectionKind::from_label("inhib"), None);
    }
}
