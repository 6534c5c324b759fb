//! Network assembly and the per-cycle update

use core::ops::AddAssign;
use std::collections::HashMap;

use crate::{
    error::*,
    layer::{DeepLayer, LayerOps},
    projection::{Inbox, Pattern, Projection, ProjectionKind},
    propagate::{InboxSink, SweepStats},
    role::LayerRole,
    LayerId, PrjnId,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Connection settings for a projection added through the builder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrjnConfig {
    /// Channel type
    pub kind: ProjectionKind,
    /// Connectivity pattern
    pub pattern: Pattern,
    /// Initial weight of every connection
    pub weight: f32,
    /// Absolute scaling of sent values
    pub scale: f32,
    /// Start disabled
    pub off: bool,
}

impl Default for PrjnConfig {
    fn default() -> Self {
        Self {
            kind: ProjectionKind::Standard,
            pattern: Pattern::Full,
            weight: 1.0,
            scale: 1.0,
            off: false,
        }
    }
}

impl PrjnConfig {
    /// Default settings for the given kind
    pub fn of_kind(kind: ProjectionKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

/// Counts of units that dispatched, per signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SendStats {
    /// Activation sweep
    pub act: SweepStats,
    /// Thalamic burst sweep
    pub trc_burst: SweepStats,
    /// Absolute context sends
    pub ctxt: u64,
}

impl SendStats {
    /// Counts accumulated since an earlier reading of the same counters
    pub fn since(&self, earlier: &SendStats) -> SendStats {
        SendStats {
            act: SweepStats {
                sends: self.act.sends - earlier.act.sends,
                unsends: self.act.unsends - earlier.act.unsends,
            },
            trc_burst: SweepStats {
                sends: self.trc_burst.sends - earlier.trc_burst.sends,
                unsends: self.trc_burst.unsends - earlier.trc_burst.unsends,
            },
            ctxt: self.ctxt - earlier.ctxt,
        }
    }
}

impl AddAssign for SendStats {
    fn add_assign(&mut self, rhs: Self) {
        self.act += rhs.act;
        self.trc_burst += rhs.trc_burst;
        self.ctxt += rhs.ctxt;
    }
}

/// Layers and projections of a built network
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<DeepLayer>,
    prjns: Vec<Projection>,
    inboxes: Vec<Inbox>,
    names: HashMap<String, LayerId>,
    stats: SendStats,
}

impl Network {
    /// Number of layers
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Number of projections
    pub fn num_prjns(&self) -> usize {
        self.prjns.len()
    }

    /// All layers in insertion order
    pub fn layers(&self) -> &[DeepLayer] {
        &self.layers
    }

    /// All projections in insertion order
    pub fn prjns(&self) -> &[Projection] {
        &self.prjns
    }

    /// Layer by id
    pub fn layer(&self, id: LayerId) -> Option<&DeepLayer> {
        self.layers.get(id.index())
    }

    /// Layer by id, mutable
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut DeepLayer> {
        self.layers.get_mut(id.index())
    }

    /// Id of the named layer
    pub fn layer_id(&self, name: &str) -> Result<LayerId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| DeepError::layer_not_found(name))
    }

    /// Layer by name
    pub fn layer_by_name(&self, name: &str) -> Result<&DeepLayer> {
        let id = self.layer_id(name)?;
        Ok(&self.layers[id.index()])
    }

    /// Layer by name, mutable
    pub fn layer_by_name_mut(&mut self, name: &str) -> Result<&mut DeepLayer> {
        let id = self.layer_id(name)?;
        Ok(&mut self.layers[id.index()])
    }

    /// Projection by id
    pub fn prjn(&self, id: PrjnId) -> Option<&Projection> {
        self.prjns.get(id.index())
    }

    /// Projection by id, mutable (weights and the off switch)
    pub fn prjn_mut(&mut self, id: PrjnId) -> Option<&mut Projection> {
        self.prjns.get_mut(id.index())
    }

    /// Increments received by a layer during the last cycle
    pub fn inbox(&self, id: LayerId) -> Option<&Inbox> {
        self.inboxes.get(id.index())
    }

    /// Clamp the named layer to external values
    pub fn apply_ext(&mut self, name: &str, ext: &[f32]) -> Result<()> {
        self.layer_by_name_mut(name)?.base_mut().apply_ext(ext)
    }

    /// Release every external clamp
    pub fn clear_ext(&mut self) {
        for ly in &mut self.layers {
            ly.base_mut().clear_ext();
        }
    }

    /// Cumulative send counts since the last reset
    pub fn send_stats(&self) -> SendStats {
        self.stats
    }

    /// Zero the cumulative send counts
    pub fn reset_stats(&mut self) {
        self.stats = SendStats::default();
    }

    /// Full reset of every layer and inbox
    pub fn init_acts(&mut self) {
        for ly in &mut self.layers {
            ly.init_acts();
        }
        for inbox in &mut self.inboxes {
            inbox.reset();
            inbox.reset_ctxt();
        }
    }

    /// Partial decay between trials.
    ///
    /// Decay clears the senders' shadows, so the inputs accumulated from them
    /// are zeroed on every layer as well.
    pub fn decay_state(&mut self, decay: f32) {
        for ly in &mut self.layers {
            ly.decay_state(decay);
            ly.init_g_inc();
        }
    }

    /// Start-of-trial bookkeeping
    pub fn trial_start(&mut self) {
        for ly in &mut self.layers {
            ly.base_mut().trial_start();
        }
    }

    /// Run one cycle within the given quarter (0-based)
    pub fn cycle(&mut self, quarter: usize) -> SendStats {
        for inbox in &mut self.inboxes {
            inbox.reset();
        }

        let mut stats = SendStats::default();
        {
            let mut sink = InboxSink::new(&self.prjns, &mut self.inboxes);
            for ly in &mut self.layers {
                stats.act += ly.send_ge_delta(&self.prjns, &mut sink);
                stats.trc_burst += ly.send_trc_burst_ge_delta(&self.prjns, &mut sink);
            }
        }

        #[cfg(feature = "parallel")]
        self.layers
            .par_iter_mut()
            .zip(self.inboxes.par_iter())
            .for_each(|(ly, inbox)| {
                ly.recv_fm_inbox(inbox);
                ly.act_fm_g(quarter);
            });

        #[cfg(not(feature = "parallel"))]
        for (ly, inbox) in self.layers.iter_mut().zip(&self.inboxes) {
            ly.recv_fm_inbox(inbox);
            ly.act_fm_g(quarter);
        }

        log::trace!(
            "q{} cycle: act {}/{} burst {}/{} (sends/unsends)",
            quarter,
            stats.act.sends,
            stats.act.unsends,
            stats.trc_burst.sends,
            stats.trc_burst.unsends
        );
        self.stats += stats;
        stats
    }

    /// End-of-quarter hooks, then the context send of burst quarters
    pub fn quarter_final(&mut self, quarter: usize) -> u64 {
        for ly in &mut self.layers {
            ly.quarter_final(quarter);
        }

        let senders: Vec<usize> = self
            .layers
            .iter()
            .enumerate()
            .filter(|(_, ly)| ly.role() == LayerRole::Superficial && ly.deep_burst.is_burst_qtr(quarter))
            .map(|(i, _)| i)
            .collect();
        if senders.is_empty() {
            return 0;
        }

        for inbox in &mut self.inboxes {
            inbox.reset_ctxt();
        }
        let mut sends = 0;
        {
            let mut sink = InboxSink::new(&self.prjns, &mut self.inboxes);
            for &li in &senders {
                sends += self.layers[li].send_ctxt_ge(&self.prjns, &mut sink);
            }
        }
        for (ly, inbox) in self.layers.iter_mut().zip(&self.inboxes) {
            if ly.role() == LayerRole::Deep && ly.deep_burst.is_burst_qtr(quarter) {
                ly.ctxt_fm_ge(inbox);
            }
        }

        log::trace!("q{} context send: {} units", quarter, sends);
        self.stats.ctxt += sends;
        sends
    }
}

/// Builder for constructing networks
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    layers: Vec<DeepLayer>,
    prjns: Vec<(String, String, PrjnConfig)>,
}

impl NetworkBuilder {
    /// Create a new network builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configured, unbuilt layer
    pub fn add_layer(mut self, layer: DeepLayer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Connect two layers by name with default settings for the kind
    pub fn connect(self, send: &str, recv: &str, kind: ProjectionKind) -> Self {
        self.connect_with(send, recv, PrjnConfig::of_kind(kind))
    }

    /// Connect two layers by name
    pub fn connect_with(mut self, send: &str, recv: &str, config: PrjnConfig) -> Self {
        self.prjns.push((send.to_string(), recv.to_string(), config));
        self
    }

    /// Build every layer and projection
    pub fn build(self) -> Result<Network> {
        let mut names = HashMap::with_capacity(self.layers.len());
        for (i, ly) in self.layers.iter().enumerate() {
            if names.insert(ly.name().to_string(), LayerId::from_index(i)?).is_some() {
                return Err(DeepError::network_topology(format!(
                    "Duplicate layer name {}",
                    ly.name()
                )));
            }
        }

        let mut layers = self.layers;
        for ly in &mut layers {
            ly.build()?;
        }

        let mut prjns = Vec::with_capacity(self.prjns.len());
        for (send_name, recv_name, config) in self.prjns {
            let send = *names
                .get(&send_name)
                .ok_or_else(|| DeepError::layer_not_found(&send_name))?;
            let recv = *names
                .get(&recv_name)
                .ok_or_else(|| DeepError::layer_not_found(&recv_name))?;

            let mut pj = Projection::new(send, recv, config.kind)
                .with_pattern(config.pattern)
                .with_weight(config.weight)
                .with_scale(config.scale)
                .with_off(config.off);
            pj.build(layers[send.index()].num_units(), layers[recv.index()].num_units())?;

            let (send_role, recv_role) = (layers[send.index()].role(), layers[recv.index()].role());
            if !send_role.sends(config.kind) || !recv_role.receives(config.kind) {
                log::warn!(
                    "{} projection {} ({}) -> {} ({}) does not match the layer roles",
                    config.kind,
                    send_name,
                    send_role,
                    recv_name,
                    recv_role
                );
            }

            let pid = PrjnId::from_index(prjns.len())?;
            layers[send.index()].send_prjns.push(pid);
            layers[recv.index()].recv_prjns.push(pid);
            prjns.push(pj);
        }

        let inboxes = layers.iter().map(|ly| Inbox::new(ly.num_units())).collect();
        log::debug!("Built network with {} layers and {} projections", layers.len(), prjns.len());

        Ok(Network {
            layers,
            prjns,
            inboxes,
            names,
            stats: SendStats::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{params::OptThreshParams, shape::Shape};
    use proptest::prelude::*;

    fn layer(name: &str, role: LayerRole, n: usize) -> DeepLayer {
        DeepLayer::new(name, role, Shape::new(&[n]))
    }

    fn set_acts(net: &mut Network, name: &str, acts: &[f32]) {
        let ly = net.layer_by_name_mut(name).unwrap();
        for (nrn, &a) in ly.base_mut().neurons_mut().iter_mut().zip(acts) {
            nrn.act = a;
        }
    }

    fn ge_raw(net: &Network, name: &str) -> Vec<f32> {
        net.layer_by_name(name).unwrap().unit_vals("GeRaw").unwrap()
    }

    #[test]
    fn test_builder_wires_projections() {
        let net = NetworkBuilder::new()
            .add_layer(layer("V1", LayerRole::Superficial, 4))
            .add_layer(layer("V1D", LayerRole::Deep, 4))
            .add_layer(layer("LGN", LayerRole::ThalamicRelay, 4))
            .connect("V1", "V1D", ProjectionKind::BurstCtxt)
            .connect("V1", "LGN", ProjectionKind::BurstTrc)
            .connect("V1D", "V1", ProjectionKind::DeepAttn)
            .build()
            .unwrap();

        assert_eq!(net.num_layers(), 3);
        assert_eq!(net.num_prjns(), 3);
        let v1 = net.layer_by_name("V1").unwrap();
        assert_eq!(v1.send_prjns(), &[PrjnId::new(0), PrjnId::new(1)]);
        assert_eq!(v1.recv_prjns(), &[PrjnId::new(2)]);
        assert_eq!(net.layer_id("LGN").unwrap(), LayerId::new(2));
        assert_eq!(net.inbox(LayerId::new(1)).unwrap().len(), 4);
    }

    #[test]
    fn test_builder_errors() {
        let err = NetworkBuilder::new()
            .add_layer(layer("A", LayerRole::Superficial, 2))
            .connect("A", "B", ProjectionKind::Standard)
            .build()
            .unwrap_err();
        assert_eq!(err, DeepError::layer_not_found("B"));

        let err = NetworkBuilder::new()
            .add_layer(layer("A", LayerRole::Superficial, 2))
            .add_layer(layer("A", LayerRole::Deep, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, DeepError::NetworkTopology { .. }));

        let err = NetworkBuilder::new()
            .add_layer(layer("A", LayerRole::Superficial, 2))
            .add_layer(layer("Z", LayerRole::Deep, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, DeepError::BuildFailure { ref layer, .. } if layer == "Z"));

        let err = NetworkBuilder::new()
            .add_layer(layer("A", LayerRole::Superficial, 2))
            .add_layer(layer("B", LayerRole::Superficial, 3))
            .connect_with(
                "A",
                "B",
                PrjnConfig {
                    pattern: Pattern::OneToOne,
                    ..PrjnConfig::default()
                },
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, DeepError::NetworkTopology { .. }));
    }

    #[test]
    fn test_three_unit_scenario() {
        let mut net = NetworkBuilder::new()
            .add_layer(
                DeepLayer::from_base(
                    crate::layer::Layer::new("In", Shape::new(&[3]))
                        .with_opt_thresh(OptThreshParams::new(0.1, 0.02).unwrap()),
                    LayerRole::Superficial,
                ),
            )
            .add_layer(layer("Out", LayerRole::Superficial, 3))
            .connect_with(
                "In",
                "Out",
                PrjnConfig {
                    pattern: Pattern::OneToOne,
                    ..PrjnConfig::default()
                },
            )
            .build()
            .unwrap();

        set_acts(&mut net, "In", &[0.0, 0.5, 0.05]);
        let stats = net.cycle(0);
        assert_eq!(stats.act.sends, 1);
        assert_eq!(ge_raw(&net, "Out"), vec![0.0, 0.5, 0.0]);
        assert_eq!(net.layer_by_name("In").unwrap().unit_val_1d("ActSent", 1).unwrap(), 0.5);

        set_acts(&mut net, "In", &[0.0, 0.02, 0.05]);
        let stats = net.cycle(0);
        assert_eq!(stats.act.unsends, 1);
        assert_eq!(ge_raw(&net, "Out"), vec![0.0, 0.0, 0.0]);
        assert_eq!(net.layer_by_name("In").unwrap().unit_val_1d("ActSent", 1).unwrap(), 0.0);
        assert_eq!(net.send_stats().act, SweepStats { sends: 1, unsends: 1 });
    }

    #[test]
    fn test_burst_reaches_only_trc() {
        let mut v2 = layer("V2", LayerRole::Superficial, 2);
        v2.deep_burst.on = false;
        let mut net = NetworkBuilder::new()
            .add_layer(layer("V1", LayerRole::Superficial, 2))
            .add_layer(layer("V1D", LayerRole::Deep, 2))
            .add_layer(layer("LGN", LayerRole::ThalamicRelay, 2))
            .add_layer(v2)
            .connect("V1", "V1D", ProjectionKind::BurstCtxt)
            .connect("V1", "LGN", ProjectionKind::BurstTrc)
            .connect("V1", "V2", ProjectionKind::Standard)
            .build()
            .unwrap();

        net.apply_ext("V1", &[1.0, 0.0]).unwrap();
        for _ in 0..2 {
            net.cycle(3);
        }
        let lgn = net.layer_by_name("LGN").unwrap();
        assert_eq!(lgn.unit_vals("TRCBurstGe").unwrap(), vec![1.0, 1.0]);
        assert_eq!(ge_raw(&net, "LGN"), vec![0.0, 0.0]);
        assert_eq!(ge_raw(&net, "V2"), vec![1.0, 1.0]);
        assert_eq!(net.layer_by_name("V2").unwrap().unit_vals("TRCBurstGe").unwrap(), vec![0.0, 0.0]);
        assert_eq!(net.layer_by_name("V1D").unwrap().unit_vals("DeepCtxt").unwrap(), vec![0.0, 0.0]);

        let sends = net.quarter_final(3);
        assert_eq!(sends, 1);
        let v1d = net.layer_by_name("V1D").unwrap();
        assert_eq!(v1d.unit_vals("DeepCtxt").unwrap(), vec![1.0, 1.0]);
        assert_eq!(net.send_stats().ctxt, 1);
    }

    #[test]
    fn test_disabled_projection_is_isolated() {
        let mut net = NetworkBuilder::new()
            .add_layer(layer("A", LayerRole::Superficial, 2))
            .add_layer(layer("B", LayerRole::Superficial, 2))
            .connect_with(
                "A",
                "B",
                PrjnConfig {
                    off: true,
                    ..PrjnConfig::default()
                },
            )
            .build()
            .unwrap();
        set_acts(&mut net, "A", &[0.8, 0.8]);
        net.cycle(0);
        assert_eq!(ge_raw(&net, "B"), vec![0.0, 0.0]);
        assert_eq!(net.layer_by_name("A").unwrap().unit_vals("ActSent").unwrap(), vec![0.8, 0.8]);
    }

    #[test]
    fn test_decay_restores_exactness() {
        let mut net = NetworkBuilder::new()
            .add_layer(layer("A", LayerRole::Superficial, 2))
            .add_layer(layer("B", LayerRole::Superficial, 2))
            .connect("A", "B", ProjectionKind::Standard)
            .build()
            .unwrap();
        set_acts(&mut net, "A", &[0.6, 0.3]);
        net.cycle(0);
        assert!((ge_raw(&net, "B")[0] - 0.9).abs() < 1e-6);

        net.decay_state(1.0);
        assert_eq!(ge_raw(&net, "B"), vec![0.0, 0.0]);
        assert_eq!(net.layer_by_name("A").unwrap().unit_vals("ActSent").unwrap(), vec![0.0, 0.0]);

        set_acts(&mut net, "A", &[0.6, 0.0]);
        net.cycle(0);
        assert!((ge_raw(&net, "B")[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_init_acts_clears_everything() {
        let mut net = NetworkBuilder::new()
            .add_layer(layer("A", LayerRole::Superficial, 2))
            .add_layer(layer("B", LayerRole::Superficial, 2))
            .connect("A", "B", ProjectionKind::Standard)
            .build()
            .unwrap();
        net.apply_ext("A", &[1.0, 1.0]).unwrap();
        net.cycle(0);
        net.cycle(0);
        net.init_acts();
        for ly in net.layers() {
            for var in ly.unit_var_names() {
                assert!(ly.unit_vals(var).unwrap().iter().all(|&v| v == 0.0), "{var}");
            }
        }
        assert!(net.inbox(LayerId::new(1)).unwrap().ge_inc.iter().all(|&v| v == 0.0));
    }

    proptest! {
        #[test]
        fn prop_receiver_input_matches_last_sent(
            steps in prop::collection::vec(prop::collection::vec(0.0f32..1.0, 4), 1..40),
            wt in 0.1f32..2.0,
        ) {
            let mut net = NetworkBuilder::new()
                .add_layer(layer("In", LayerRole::Superficial, 4))
                .add_layer(layer("Hid", LayerRole::Superficial, 3))
                .connect_with("In", "Hid", PrjnConfig { weight: wt, ..PrjnConfig::default() })
                .build()
                .unwrap();

            for acts in &steps {
                set_acts(&mut net, "In", acts);
                net.cycle(0);
                let sent: f32 = net.layer_by_name("In").unwrap().unit_vals("ActSent").unwrap().iter().sum();
                for g in ge_raw(&net, "Hid") {
                    prop_assert!((g - wt * sent).abs() < 1e-3);
                }
            }
        }

        #[test]
        fn prop_trc_input_matches_last_sent_burst(
            steps in prop::collection::vec(prop::collection::vec(0.0f32..1.0, 3), 1..40),
        ) {
            let mut net = NetworkBuilder::new()
                .add_layer(layer("V1", LayerRole::Superficial, 3))
                .add_layer(layer("LGN", LayerRole::ThalamicRelay, 2))
                .connect_with("V1", "LGN", PrjnConfig { weight: 0.5, ..PrjnConfig::of_kind(ProjectionKind::BurstTrc) })
                .build()
                .unwrap();

            for bursts in &steps {
                let v1 = net.layer_by_name_mut("V1").unwrap();
                for (dn, &b) in v1.deep_neurs.iter_mut().zip(bursts) {
                    dn.deep_burst = b;
                }
                net.cycle(0);
                let sent: f32 = net.layer_by_name("V1").unwrap().unit_vals("DeepBurstSent").unwrap().iter().sum();
                for g in net.layer_by_name("LGN").unwrap().unit_vals("TRCBurstGe").unwrap() {
                    prop_assert!((g - 0.5 * sent).abs() < 1e-3);
                }
            }
        }

        #[test]
        fn prop_no_send_within_delta(base in 0.2f32..0.9, jitter in -0.004f32..0.004) {
            let mut net = NetworkBuilder::new()
                .add_layer(layer("A", LayerRole::Superficial, 1))
                .add_layer(layer("B", LayerRole::Superficial, 1))
                .connect_with("A", "B", PrjnConfig { weight: 0.1, ..PrjnConfig::default() })
                .build()
                .unwrap();
            set_acts(&mut net, "A", &[base]);
            prop_assert_eq!(net.cycle(0).act.sends, 1);
            set_acts(&mut net, "A", &[base + jitter]);
            prop_assert_eq!(net.cycle(0).act.total(), 0);
        }
    }
}
