//! Process-wide running statistics
//!
//! One accumulator per analyzer instance, updated by every `analyze`
//! call, explicitly resettable. Flat and serializable so it can ride
//! along in checkpoints.

use crate::analyzer::CompoundingAnalysis;
use confluence_core::{LayerId, StackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Incremental count + mean for one layer or bridge.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatAccumulator {
    pub count: u64,
    pub mean: f64,
}

impl StatAccumulator {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }
}

/// Running statistics across every analyzed result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunningMetrics {
    /// Total results analyzed.
    pub samples: u64,
    /// Incremental average compounding factor.
    pub avg_compounding_factor: f64,
    /// Largest compounding factor observed.
    pub max_compounding_factor: f64,
    /// Cumulative emergent value.
    pub total_emergent_value: f64,
    /// Per-layer confidence statistics.
    pub per_layer: BTreeMap<LayerId, StatAccumulator>,
    /// Per-bridge amplification statistics, keyed `source->target`.
    pub per_bridge: BTreeMap<String, StatAccumulator>,
}

impl RunningMetrics {
    /// Fold one analyzed result into the accumulator.
    pub fn record(&mut self, result: &StackResult, analysis: &CompoundingAnalysis) {
        self.samples += 1;
        self.avg_compounding_factor +=
            (analysis.compounding_factor - self.avg_compounding_factor) / self.samples as f64;
        if analysis.compounding_factor > self.max_compounding_factor {
            self.max_compounding_factor = analysis.compounding_factor;
        }
        self.total_emergent_value += analysis.emergent_value;

        for (layer, state) in &result.layers {
            self.per_layer.entry(*layer).or_default().push(state.confidence());
        }
        for bridge in &result.bridges {
            let key = format!("{}->{}", bridge.source, bridge.target);
            self.per_bridge.entry(key).or_default().push(bridge.amplification);
        }
    }
}
