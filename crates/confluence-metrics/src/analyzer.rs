//! CompoundingAnalyzer — multiplicative-vs-additive value of a stack
//!
//! The compounding factor is the ratio of geometric to arithmetic mean of
//! the final layer confidences. By AM–GM the ratio never exceeds 1 for raw
//! inputs; a factor above 1 can only come from post-amplification
//! confidences, which is exactly the signal this analyzer measures.
//! Metrics run on the final StackResult, i.e. post-amplification.

use crate::running::RunningMetrics;
use confluence_core::config::AnalysisConfig;
use confluence_core::{RunId, StackResult, Termination};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

/// Qualitative label for the mechanism behind the observed emergence.
/// Rules are evaluated in declaration order; first match wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynergyClass {
    /// A bridge's amplification boost exceeded the resonance threshold.
    Resonance,
    /// Enough distinct bridges carry a positive interaction value.
    Synergy,
    /// Many layers contribute near-equally (low confidence variance).
    Collective,
    /// The stack needed several iterations to settle.
    SelfOrganization,
    Unclassified,
}

impl std::fmt::Display for SynergyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SynergyClass::Resonance => "resonance",
            SynergyClass::Synergy => "synergy",
            SynergyClass::Collective => "collective",
            SynergyClass::SelfOrganization => "self_organization",
            SynergyClass::Unclassified => "unclassified",
        };
        write!(f, "{}", s)
    }
}

/// Output of one `analyze` call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompoundingAnalysis {
    pub run_id: RunId,
    pub arithmetic_mean: f64,
    pub geometric_mean: f64,
    /// geometric / arithmetic mean; 0 when the arithmetic mean is 0.
    pub compounding_factor: f64,
    /// geometric minus arithmetic mean.
    pub emergent_value: f64,
    pub is_beneficial: bool,
    pub is_significant: bool,
    pub classification: SynergyClass,
}

/// Interaction value of one bridge: what the weighted resonance adds over
/// the plain average of the two endpoint confidences.
pub fn interaction_value(weight: f64, ci: f64, cj: f64) -> f64 {
    weight * (ci * cj).sqrt() - (ci + cj) / 2.0
}

/// Stateless per-result computation plus a process-wide running
/// accumulator. The accumulator is mutex-guarded so concurrent `analyze`
/// calls cannot interleave updates.
pub struct CompoundingAnalyzer {
    thresholds: AnalysisConfig,
    running: Mutex<RunningMetrics>,
}

impl CompoundingAnalyzer {
    pub fn new(thresholds: AnalysisConfig) -> Self {
        Self::with_metrics(thresholds, RunningMetrics::default())
    }

    /// Resume with previously checkpointed running metrics.
    pub fn with_metrics(thresholds: AnalysisConfig, metrics: RunningMetrics) -> Self {
        Self {
            thresholds,
            running: Mutex::new(metrics),
        }
    }

    /// Analyze a stack result. Never fails on valid input; degenerate
    /// numeric cases come back as sentinel values.
    pub fn analyze(&self, result: &StackResult) -> CompoundingAnalysis {
        let confidences = result.confidences();
        let arithmetic_mean = arithmetic_mean(&confidences);
        let geometric_mean = geometric_mean(&confidences);

        let compounding_factor = if arithmetic_mean == 0.0 {
            0.0
        } else {
            geometric_mean / arithmetic_mean
        };
        let emergent_value = geometric_mean - arithmetic_mean;

        let analysis = CompoundingAnalysis {
            run_id: result.run_id.clone(),
            arithmetic_mean,
            geometric_mean,
            compounding_factor,
            emergent_value,
            // Strictly greater than 1, with float headroom so a uniform
            // stack never reads as beneficial.
            is_beneficial: compounding_factor > 1.0 + 1e-9,
            is_significant: emergent_value.abs() > self.thresholds.significance_threshold,
            classification: self.classify(result, &confidences),
        };

        debug!(
            run_id = %analysis.run_id,
            compounding_factor = analysis.compounding_factor,
            emergent_value = analysis.emergent_value,
            classification = %analysis.classification,
            "analyzed stack result"
        );

        let mut running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        running.record(result, &analysis);
        analysis
    }

    /// Snapshot of the running statistics.
    pub fn running_metrics(&self) -> RunningMetrics {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Clear the accumulator.
    pub fn reset(&self) {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *running = RunningMetrics::default();
    }

    fn classify(&self, result: &StackResult, confidences: &[f64]) -> SynergyClass {
        let t = &self.thresholds;

        if result
            .bridges
            .iter()
            .any(|b| b.amplification > t.resonance_boost_threshold)
        {
            return SynergyClass::Resonance;
        }

        let synergetic = result
            .bridges
            .iter()
            .filter(|b| {
                match (result.confidence(b.source), result.confidence(b.target)) {
                    (Some(ci), Some(cj)) => {
                        interaction_value(b.weight, ci, cj) > t.synergy_interaction_threshold
                    }
                    _ => false,
                }
            })
            .count();
        if synergetic >= t.synergy_min_bridges {
            return SynergyClass::Synergy;
        }

        if confidences.len() >= t.collective_min_layers
            && variance(confidences) < t.collective_variance_threshold
        {
            return SynergyClass::Collective;
        }

        if result.termination == Termination::Converged
            && result.iterations > t.self_organization_min_iterations
        {
            return SynergyClass::SelfOrganization;
        }

        SynergyClass::Unclassified
    }
}

fn arithmetic_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// nth root of the product. Zero by definition when any value is 0: a
/// stack with one dead layer reports zero multiplicative value no matter
/// how high the arithmetic mean is.
fn geometric_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.iter().any(|&v| v == 0.0) {
        return 0.0;
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    (log_sum / values.len() as f64).exp()
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = arithmetic_mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
