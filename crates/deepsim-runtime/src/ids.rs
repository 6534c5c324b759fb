//! Index types for layers and projections within a network

use core::fmt;

use crate::error::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a layer in its network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerId(pub u32);

impl LayerId {
    /// Create a new layer ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Position in the network's layer list
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// ID for a list position; fails past `u32::MAX` layers
    pub fn from_index(idx: usize) -> Result<Self> {
        u32::try_from(idx)
            .map(Self)
            .map_err(|_| DeepError::network_topology(format!("too many layers: index {idx} exceeds u32")))
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Index of a projection in its network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrjnId(pub u32);

impl PrjnId {
    /// Create a new projection ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Position in the network's projection list
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// ID for a list position; fails past `u32::MAX` projections
    pub fn from_index(idx: usize) -> Result<Self> {
        u32::try_from(idx)
            .map(Self)
            .map_err(|_| DeepError::network_topology(format!("too many projections: index {idx} exceeds u32")))
    }
}

impl fmt::Display for PrjnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        let ly = LayerId::new(3);
        assert_eq!(ly.raw(), 3);
        assert_eq!(ly.index(), 3);
        assert_eq!(ly.to_string(), "L3");
        assert_eq!(PrjnId::new(7).to_string(), "P7");
        assert!(PrjnId::new(1) < PrjnId::new(2));
    }

    #[test]
    fn test_from_index() {
        assert_eq!(LayerId::from_index(5).unwrap(), LayerId::new(5));
        assert_eq!(PrjnId::from_index(u32::MAX as usize).unwrap(), PrjnId::new(u32::MAX));
        assert!(matches!(
            LayerId::from_index(u32::MAX as usize + 1),
            Err(DeepError::NetworkTopology { .. })
        ));
        assert!(matches!(PrjnId::from_index(usize::MAX), Err(DeepError::NetworkTopology { .. })));
    }
}
