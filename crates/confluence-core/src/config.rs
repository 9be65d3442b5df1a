//! Engine configuration
//!
//! All tunable coefficients in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists. Stability constraints
//! are enforced at construction via [`EngineConfig::validate`] — never at
//! run time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Worst-case pre-amplification resonance is 1.0, so `k` above this bound
/// would allow a construction-time boost beyond 1.5 and risks runaway
/// amplification.
pub const MAX_SAFE_K: f64 = 0.5;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Amplification coefficients.
    pub amplification: AmplificationConfig,
    /// Convergence loop parameters.
    pub convergence: ConvergenceConfig,
    /// Analyzer thresholds.
    pub analysis: AnalysisConfig,
    /// Online weight learning parameters.
    pub learning: LearningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplificationConfig {
    /// Global amplification coefficient. Per-iteration boost is
    /// `1 + sqrt(ci*cj) * k`; the target operating band is 0.1–0.2 boost
    /// per iteration, and `k` must stay at or below [`MAX_SAFE_K`].
    pub k: f64,
    /// Any confidence crossing this ceiling aborts the run as diverged.
    pub sanity_ceiling: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// A run converges when the max absolute confidence change across all
    /// layers drops below this.
    pub epsilon: f64,
    /// Hard iteration cap. Hitting it is a valid outcome, not an error.
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// `|emergent_value|` above this marks the run significant.
    pub significance_threshold: f64,
    /// A bridge boost above this classifies the run as Resonance.
    pub resonance_boost_threshold: f64,
    /// Interaction value above this counts a bridge toward Synergy.
    pub synergy_interaction_threshold: f64,
    /// Distinct bridges needed for Synergy.
    pub synergy_min_bridges: usize,
    /// Confidence variance below this (with enough layers) is Collective.
    pub collective_variance_threshold: f64,
    /// Layers needed for Collective.
    pub collective_min_layers: usize,
    /// Converged runs longer than this classify as SelfOrganization.
    pub self_organization_min_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Learning rate η for interaction weight updates.
    pub rate: f64,
}

// ============================================================
// Defaults
// ============================================================

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            amplification: AmplificationConfig::default(),
            convergence: ConvergenceConfig::default(),
            analysis: AnalysisConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

impl Default for AmplificationConfig {
    fn default() -> Self {
        Self {
            k: 0.15,
            sanity_ceiling: 10.0,
        }
    }
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            max_iterations: 6,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 0.15,
            resonance_boost_threshold: 1.5,
            synergy_interaction_threshold: 0.1,
            synergy_min_bridges: 3,
            collective_variance_threshold: 0.05,
            collective_min_layers: 4,
            self_organization_min_iterations: 2,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self { rate: 0.01 }
    }
}

// ============================================================
// Loading & validation
// ============================================================

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Enforce stability constraints. Called by the engine constructor.
    pub fn validate(&self) -> Result<()> {
        let a = &self.amplification;
        if !a.k.is_finite() || a.k < 0.0 {
            return Err(Error::config(format!(
                "amplification.k must be a non-negative finite number, got {}",
                a.k
            )));
        }
        if a.k > MAX_SAFE_K {
            return Err(Error::config(format!(
                "amplification.k = {} allows boost > 1.5 (max safe k is {})",
                a.k, MAX_SAFE_K
            )));
        }
        if !a.sanity_ceiling.is_finite() || a.sanity_ceiling <= 1.0 {
            return Err(Error::config(format!(
                "amplification.sanity_ceiling must exceed 1.0, got {}",
                a.sanity_ceiling
            )));
        }

        let c = &self.convergence;
        if !c.epsilon.is_finite() || c.epsilon <= 0.0 {
            return Err(Error::config(format!(
                "convergence.epsilon must be positive, got {}",
                c.epsilon
            )));
        }
        if c.max_iterations == 0 || c.max_iterations > 64 {
            return Err(Error::config(format!(
                "convergence.max_iterations must be in 1..=64, got {}",
                c.max_iterations
            )));
        }

        let l = &self.learning;
        if !l.rate.is_finite() || l.rate <= 0.0 || l.rate > 0.1 {
            return Err(Error::config(format!(
                "learning.rate must be in (0, 0.1], got {}",
                l.rate
            )));
        }

        Ok(())
    }
}
