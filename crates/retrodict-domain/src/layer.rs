//! Layer module - strata of reality used to scope consistency checks

use serde::{Deserialize, Serialize};

/// A stratum of reality, from physical processes up to paradigms
///
/// Layers are ordered; an edge whose endpoints sit on different layers is a
/// cross-layer edge and is subject to the triangulation rule and the
/// cross-layer timing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// L0: matter, energy, geology, climate
    L0,
    /// L1: life, ecosystems, genetic information
    L1,
    /// L2: language, art, ritual, memes
    L2,
    /// L3: markets, infrastructure, networks
    L3,
    /// L4: global systems, geopolitics, paradigms
    L4,
}

impl Layer {
    /// All layers in ascending order
    pub const ALL: [Layer; 5] = [Layer::L0, Layer::L1, Layer::L2, Layer::L3, Layer::L4];

    /// Get the layer name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::L0 => "L0",
            Layer::L1 => "L1",
            Layer::L2 => "L2",
            Layer::L3 => "L3",
            Layer::L4 => "L4",
        }
    }

    /// Human-readable stratum name
    pub fn stratum(&self) -> &'static str {
        match self {
            Layer::L0 => "physical",
            Layer::L1 => "biological",
            Layer::L2 => "cultural",
            Layer::L3 => "techno-economic",
            Layer::L4 => "metasystemic",
        }
    }

    /// Numeric depth (0..=4)
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Parse a layer from `L0`..`L4` or its stratum name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "l0" | "physical" => Some(Layer::L0),
            "l1" | "biological" => Some(Layer::L1),
            "l2" | "cultural" => Some(Layer::L2),
            "l3" | "techno-economic" => Some(Layer::L3),
            "l4" | "metasystemic" => Some(Layer::L4),
            _ => None,
        }
    }

    /// Number of strata separating two layers
    pub fn distance(&self, other: Layer) -> u8 {
        self.index().abs_diff(other.index())
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid layer: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_parse() {
        assert_eq!(Layer::parse("L3"), Some(Layer::L3));
        assert_eq!(Layer::parse("physical"), Some(Layer::L0));
        assert_eq!(Layer::parse("L9"), None);
    }

    #[test]
    fn test_layer_distance() {
        assert_eq!(Layer::L0.distance(Layer::L3), 3);
        assert_eq!(Layer::L3.distance(Layer::L0), 3);
        assert_eq!(Layer::L2.distance(Layer::L2), 0);
    }
}
