//! Cortical-thalamic delta-propagation engine for rate-coded networks
//!
//! Layers take one of three roles in the superficial / deep / thalamic relay
//! loop. Every cycle each layer broadcasts changes in its activation and its
//! burst signal over typed projections, sending only when a value moved by
//! more than a threshold since it was last sent. Receivers accumulate the
//! increments into their conductances, so their input always matches the
//! weighted sum of the senders' last-sent values.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;
pub mod ids;
pub mod layer;
pub mod network;
pub mod neuron;
pub mod params;
pub mod projection;
pub mod propagate;
pub mod role;
pub mod shape;
pub mod simulation;

// Re-export essential types
pub use error::{DeepError, Result};
pub use ids::{LayerId, PrjnId};
pub use layer::{DeepLayer, Layer, LayerOps};
pub use network::{Network, NetworkBuilder, PrjnConfig, SendStats};
pub use neuron::{DeepNeuron, DeepNeurons, Neuron, ALL_NEURON_VARS, DEEP_NEURON_VARS, NEURON_VARS};
pub use params::{ActParams, DeepAttnParams, DeepBurstParams, DeepCtxtParams, DeepTrcParams, OptThreshParams};
pub use projection::{Channel, Inbox, Pattern, Projection, ProjectionKind};
pub use propagate::{DeltaSink, SweepStats};
pub use role::LayerRole;
pub use shape::Shape;
pub use simulation::{
    run_trials, CycleTime, SimulationEngine, SimulationParams, SimulationResult, TrialInput, TrialRecord,
};

/// Runtime crate version for compatibility checking
pub const RUNTIME_VERSION: u32 = 1;
