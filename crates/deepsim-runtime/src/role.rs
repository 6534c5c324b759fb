//! Functional roles of layers in the cortical-thalamic loop

use core::fmt;

use crate::projection::ProjectionKind;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Role a layer plays in the superficial / deep / thalamic relay loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LayerRole {
    /// Superficial cortical neurons: compute burst from activation and send
    /// it to deep (context) and thalamic relay (outcome) layers
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "super"))]
    Superficial,
    /// Deep corticothalamic neurons: integrate context, drive attention in
    /// superficial layers and predictions in thalamic relay layers
    #[cfg_attr(feature = "serde", serde(rename = "deep"))]
    Deep,
    /// Thalamic relay cells: predictions from deep layers in the minus phase,
    /// outcomes from superficial bursts in the plus phase
    #[cfg_attr(feature = "serde", serde(rename = "trc"))]
    ThalamicRelay,
}

impl LayerRole {
    /// All roles, in declaration order
    pub const ALL: [LayerRole; 3] = [Self::Superficial, Self::Deep, Self::ThalamicRelay];

    /// True if a layer of this role is expected to send on the given kind
    pub fn sends(self, kind: ProjectionKind) -> bool {
        match kind {
            ProjectionKind::Standard => true,
            ProjectionKind::BurstCtxt | ProjectionKind::BurstTrc => self == Self::Superficial,
            ProjectionKind::DeepAttn => self == Self::Deep,
        }
    }

    /// True if a layer of this role is expected to receive on the given kind
    pub fn receives(self, kind: ProjectionKind) -> bool {
        match kind {
            ProjectionKind::Standard => true,
            ProjectionKind::BurstCtxt => self == Self::Deep,
            ProjectionKind::BurstTrc => self == Self::ThalamicRelay,
            ProjectionKind::DeepAttn => self == Self::Superficial,
        }
    }

    /// Short label used in configuration files and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Superficial => "super",
            Self::Deep => "deep",
            Self::ThalamicRelay => "trc",
        }
    }

    /// Parse a label produced by [`LayerRole::as_str`]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == label)
    }
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_channel_tables() {
        use ProjectionKind::*;

        assert!(LayerRole::Superficial.sends(BurstTrc));
        assert!(LayerRole::Superficial.sends(BurstCtxt));
        assert!(!LayerRole::Superficial.sends(DeepAttn));
        assert!(LayerRole::Superficial.receives(DeepAttn));

        assert!(LayerRole::Deep.sends(DeepAttn));
        assert!(LayerRole::Deep.receives(BurstCtxt));
        assert!(!LayerRole::Deep.receives(BurstTrc));

        assert!(LayerRole::ThalamicRelay.receives(BurstTrc));
        assert!(!LayerRole::ThalamicRelay.sends(BurstTrc));

        for role in LayerRole::ALL {
            assert!(role.sends(Standard));
            assert!(role.receives(Standard));
        }
    }

    #[test]
    fn test_labels() {
        for role in LayerRole::ALL {
            assert_eq!(LayerRole::from_label(role.as_str()), Some(role));
        }
        assert_eq!(LayerRole::from_label("hidden"), None);
        assert_eq!(LayerRole::ThalamicRelay.to_string(), "trc");
    }
}
