//! Bridge topology — the fixed graph wiring
//!
//! Defined once at system configuration time and never reshaped at
//! runtime; only interaction weights change, and those live in
//! [`SharedWeights`](crate::types::SharedWeights), not here.

use crate::error::{Error, Result};
use crate::types::{BridgeId, BridgeSpec, LayerId};
use serde::{Deserialize, Serialize};

/// The fixed bridge set. Small, connected where wired, not necessarily
/// complete. Layers without bridges are legal — they seed and hold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Topology {
    bridges: Vec<BridgeSpec>,
}

impl Topology {
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::default()
    }

    /// An empty topology (no bridges). Every run converges immediately.
    pub fn empty() -> Self {
        Self {
            bridges: Vec::new(),
        }
    }

    pub fn bridges(&self) -> impl Iterator<Item = (BridgeId, &BridgeSpec)> {
        self.bridges
            .iter()
            .enumerate()
            .map(|(i, spec)| (BridgeId(i), spec))
    }

    pub fn bridge(&self, id: BridgeId) -> Option<&BridgeSpec> {
        self.bridges.get(id.index())
    }

    pub fn bridge_count(&self) -> usize {
        self.bridges.len()
    }

    /// Starting weights in bridge order, for seeding the shared table.
    pub fn initial_weights(&self) -> Vec<f64> {
        self.bridges.iter().map(|b| b.initial_weight).collect()
    }

    /// Layers that bridge into `layer` (either direction).
    pub fn neighbors(&self, layer: LayerId) -> Vec<LayerId> {
        let mut out = Vec::new();
        for b in &self.bridges {
            if b.source == layer {
                out.push(b.target);
            } else if b.target == layer {
                out.push(b.source);
            }
        }
        out
    }
}

#[derive(Default)]
pub struct TopologyBuilder {
    bridges: Vec<BridgeSpec>,
}

impl TopologyBuilder {
    /// Add a bridge between two layers.
    pub fn bridge(
        mut self,
        source: LayerId,
        target: LayerId,
        base_resonance: f64,
        initial_weight: f64,
    ) -> Self {
        self.bridges.push(BridgeSpec {
            source,
            target,
            base_resonance,
            initial_weight,
        });
        self
    }

    /// Validate and freeze the topology.
    pub fn build(self) -> Result<Topology> {
        for (i, b) in self.bridges.iter().enumerate() {
            if b.source == b.target {
                return Err(Error::topology(format!(
                    "bridge {} connects {} to itself",
                    i, b.source
                )));
            }
            if !(0.0..=1.0).contains(&b.base_resonance) {
                return Err(Error::topology(format!(
                    "bridge {} base_resonance {} outside [0, 1]",
                    b.key(),
                    b.base_resonance
                )));
            }
            if !(0.0..=1.0).contains(&b.initial_weight) {
                return Err(Error::topology(format!(
                    "bridge {} initial_weight {} outside [0, 1]",
                    b.key(),
                    b.initial_weight
                )));
            }
            for other in &self.bridges[..i] {
                let same = other.source == b.source && other.target == b.target;
                let flipped = other.source == b.target && other.target == b.source;
                if same || flipped {
                    return Err(Error::topology(format!(
                        "duplicate bridge between {} and {}",
                        b.source, b.target
                    )));
                }
            }
        }
        Ok(Topology {
            bridges: self.bridges,
        })
    }
}

/// The reference 7-layer wiring: a hub around Base plus the cross-cutting
/// links the reference system calibrated. Resonance constants are the
/// calibrated values; every bridge starts at weight 0.5.
pub fn default_topology() -> Topology {
    Topology::builder()
        .bridge(LayerId::Base, LayerId::Extended, 0.85, 0.5)
        .bridge(LayerId::Base, LayerId::Language, 0.80, 0.5)
        .bridge(LayerId::Extended, LayerId::CrossDomain, 0.75, 0.5)
        .bridge(LayerId::CrossDomain, LayerId::Intuition, 0.70, 0.5)
        .bridge(LayerId::Intuition, LayerId::Language, 0.65, 0.5)
        .bridge(LayerId::Language, LayerId::Collaborative, 0.75, 0.5)
        .bridge(LayerId::Collaborative, LayerId::External, 0.60, 0.5)
        .bridge(LayerId::Extended, LayerId::Intuition, 0.55, 0.5)
        .build()
        .expect("default topology is statically valid")
}
