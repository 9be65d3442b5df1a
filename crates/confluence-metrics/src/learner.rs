//! WeightLearner — online adjustment of bridge interaction weights
//!
//! `w' = clamp(w + η · (actual − predicted), 0, 1)`. Predicted emergence
//! for a bridge is its own interaction value at the current weight;
//! actual emergence is the run's stack-level emergent value. Every bridge
//! therefore learns from the same global signal — the source system never
//! attributed emergence per bridge, and that conflation is preserved here
//! as a known limitation rather than replaced with a finer scheme.

use crate::analyzer::{interaction_value, CompoundingAnalysis};
use confluence_core::{BridgeId, Error, Result, SharedWeights, StackResult};
use tracing::debug;

pub struct WeightLearner {
    rate: f64,
    weights: SharedWeights,
}

impl WeightLearner {
    /// `weights` is the engine's shared table (`IntegrationEngine::weights`);
    /// the learner is its single writer.
    pub fn new(rate: f64, weights: SharedWeights) -> Self {
        Self { rate, weights }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Apply one bounded update to a bridge's interaction weight.
    /// Returns the new weight. When predicted equals actual the weight is
    /// unchanged. Out-of-range results clamp instead of failing.
    pub fn update(&self, bridge: BridgeId, predicted: f64, actual: f64) -> Result<f64> {
        let current = self
            .weights
            .get(bridge)
            .ok_or(Error::UnknownBridge(bridge.index()))?;
        let updated = self.weights.set(bridge, current + self.rate * (actual - predicted))?;
        debug!(
            bridge = %bridge,
            predicted,
            actual,
            from = current,
            to = updated,
            "weight update"
        );
        Ok(updated)
    }

    /// Update every bridge of a run from its analysis. Each bridge's
    /// predicted emergence is its interaction value at the weight the run
    /// executed with; the shared actual signal is the run's emergent value.
    pub fn learn_from(
        &self,
        result: &StackResult,
        analysis: &CompoundingAnalysis,
    ) -> Result<Vec<(BridgeId, f64)>> {
        let mut updates = Vec::with_capacity(result.bridges.len());
        for bridge in &result.bridges {
            let (ci, cj) = match (
                result.confidence(bridge.source),
                result.confidence(bridge.target),
            ) {
                (Some(ci), Some(cj)) => (ci, cj),
                _ => continue,
            };
            let predicted = interaction_value(bridge.weight, ci, cj);
            let new_weight = self.update(bridge.id, predicted, analysis.emergent_value)?;
            updates.push((bridge.id, new_weight));
        }
        Ok(updates)
    }
}
