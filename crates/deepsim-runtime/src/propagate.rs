//! Delta-threshold propagation
//!
//! Units only broadcast when their value moves by more than
//! [`OptThreshParams::delta`] since the last send, and only while above
//! [`OptThreshParams::send`]. When a unit drops back below the send
//! threshold, the whole previously sent value is retracted in one step, so
//! a receiver's accumulated input always equals the weighted sum of the
//! senders' last-sent values.

use core::ops::AddAssign;

use crate::{
    params::OptThreshParams,
    projection::{Channel, Inbox, Projection, ProjectionKind},
    PrjnId,
};

/// Outcome of the send test for one unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SendEvent {
    /// Value moved enough while above threshold: send the change
    Send(f32),
    /// Value fell below threshold: retract everything sent so far
    Unsend(f32),
}

impl SendEvent {
    /// Signed amount to dispatch
    pub fn delta(self) -> f32 {
        match self {
            Self::Send(d) | Self::Unsend(d) => d,
        }
    }
}

/// Decide whether a unit sends this cycle, updating its sent shadow
#[inline]
pub fn send_event(value: f32, sent: &mut f32, thr: &OptThreshParams) -> Option<SendEvent> {
    if value > thr.send {
        let delta = value - *sent;
        if delta.abs() > thr.delta {
            *sent = value;
            return Some(SendEvent::Send(delta));
        }
        None
    } else if *sent > thr.send {
        let delta = -*sent;
        *sent = 0.0;
        Some(SendEvent::Unsend(delta))
    } else {
        None
    }
}

/// Channel routing of the activation sweep
pub fn route_act(kind: ProjectionKind) -> Option<Channel> {
    match kind {
        ProjectionKind::Standard => Some(Channel::Ge),
        ProjectionKind::DeepAttn => Some(Channel::AttnGe),
        ProjectionKind::BurstCtxt | ProjectionKind::BurstTrc => None,
    }
}

/// Channel routing of the thalamic burst sweep
pub fn route_trc_burst(kind: ProjectionKind) -> Option<Channel> {
    match kind {
        ProjectionKind::BurstTrc => Some(Channel::TrcBurstGe),
        ProjectionKind::Standard | ProjectionKind::BurstCtxt | ProjectionKind::DeepAttn => None,
    }
}

/// Channel routing of the context send
pub fn route_ctxt(kind: ProjectionKind) -> Option<Channel> {
    match kind {
        ProjectionKind::BurstCtxt => Some(Channel::CtxtGe),
        ProjectionKind::Standard | ProjectionKind::BurstTrc | ProjectionKind::DeepAttn => None,
    }
}

/// Receiver of dispatched sends
pub trait DeltaSink {
    /// Deliver `value` from sending unit `sender` over projection `prjn`
    fn deliver(&mut self, prjn: PrjnId, channel: Channel, sender: usize, value: f32);
}

/// Sink applying sends through the projection primitives into per-layer inboxes
pub struct InboxSink<'a> {
    prjns: &'a [Projection],
    inboxes: &'a mut [Inbox],
}

impl<'a> InboxSink<'a> {
    /// Sink over a network's projections and its inboxes (one per layer)
    pub fn new(prjns: &'a [Projection], inboxes: &'a mut [Inbox]) -> Self {
        Self { prjns, inboxes }
    }
}

impl DeltaSink for InboxSink<'_> {
    fn deliver(&mut self, prjn: PrjnId, channel: Channel, sender: usize, value: f32) {
        let pj = &self.prjns[prjn.index()];
        pj.send_on(channel, sender, value, &mut self.inboxes[pj.recv.index()]);
    }
}

/// Send and retraction counts of one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepStats {
    /// Units that sent a change
    pub sends: u64,
    /// Units that retracted their sent value
    pub unsends: u64,
}

impl SweepStats {
    /// Total dispatching units
    pub fn total(&self) -> u64 {
        self.sends + self.unsends
    }
}

impl AddAssign for SweepStats {
    fn add_assign(&mut self, rhs: Self) {
        self.sends += rhs.sends;
        self.unsends += rhs.unsends;
    }
}

/// Run the delta send protocol over a slice of units.
///
/// `field` yields a unit's current value and its sent shadow. Every event is
/// dispatched to each enabled projection in `send_prjns` for which `route`
/// yields a channel; the shadow is updated even when no projection qualifies.
pub fn sweep<T, S: DeltaSink>(
    units: &mut [T],
    field: fn(&mut T) -> (f32, &mut f32),
    thr: &OptThreshParams,
    send_prjns: &[PrjnId],
    prjns: &[Projection],
    route: fn(ProjectionKind) -> Option<Channel>,
    sink: &mut S,
) -> SweepStats {
    let mut stats = SweepStats::default();
    for (ni, unit) in units.iter_mut().enumerate() {
        let (value, sent) = field(unit);
        let Some(event) = send_event(value, sent, thr) else {
            continue;
        };
        match event {
            SendEvent::Send(_) => stats.sends += 1,
            SendEvent::Unsend(_) => stats.unsends += 1,
        }
        dispatch(ni, event.delta(), send_prjns, prjns, route, sink);
    }
    stats
}

/// Send absolute values of every unit above the send threshold
pub fn send_absolute<T, S: DeltaSink>(
    units: &[T],
    field: fn(&T) -> f32,
    thr: &OptThreshParams,
    send_prjns: &[PrjnId],
    prjns: &[Projection],
    route: fn(ProjectionKind) -> Option<Channel>,
    sink: &mut S,
) -> u64 {
    let mut sends = 0;
    for (ni, unit) in units.iter().enumerate() {
        let value = field(unit);
        if value > thr.send {
            dispatch(ni, value, send_prjns, prjns, route, sink);
            sends += 1;
        }
    }
    sends
}

fn dispatch<S: DeltaSink>(
    sender: usize,
    value: f32,
    send_prjns: &[PrjnId],
    prjns: &[Projection],
    route: fn(ProjectionKind) -> Option<Channel>,
    sink: &mut S,
) {
    for &pid in send_prjns {
        let pj = &prjns[pid.index()];
        if pj.is_off() {
            continue;
        }
        if let Some(channel) = route(pj.kind()) {
            sink.deliver(pid, channel, sender, value);
        }
    }
}
