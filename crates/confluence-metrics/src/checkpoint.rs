//! Checkpoint persistence — bridge weights and running metrics
//!
//! The only state worth persisting across process restarts. Stored as a
//! flat JSON document: a `source->target` weight map plus the running
//! metrics snapshot.

use crate::running::RunningMetrics;
use chrono::{DateTime, Utc};
use confluence_core::{Result, SharedWeights, Topology};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Interaction weights keyed by bridge (`source->target`).
    pub weights: BTreeMap<String, f64>,
    pub metrics: RunningMetrics,
}

impl Checkpoint {
    pub const VERSION: u32 = 1;

    /// Capture the current weights and metrics.
    pub fn capture(topology: &Topology, weights: &SharedWeights, metrics: RunningMetrics) -> Self {
        let snapshot = weights.snapshot();
        let weights = topology
            .bridges()
            .map(|(id, spec)| (spec.key(), snapshot[id.index()]))
            .collect();
        Self {
            version: Self::VERSION,
            saved_at: Utc::now(),
            weights,
            metrics,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved checkpoint to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let checkpoint: Self = serde_json::from_str(&content)?;
        info!(
            "Loaded checkpoint from {} (saved {})",
            path.display(),
            checkpoint.saved_at
        );
        Ok(checkpoint)
    }

    /// Push saved weights back into a live weight table. Bridges missing
    /// from the checkpoint keep their current weight; stale checkpoint
    /// keys are skipped. Returns the number of weights restored.
    pub fn restore_weights(&self, topology: &Topology, weights: &SharedWeights) -> Result<usize> {
        let mut restored = 0;
        for (id, spec) in topology.bridges() {
            match self.weights.get(&spec.key()) {
                Some(&w) => {
                    weights.set(id, w)?;
                    restored += 1;
                }
                None => warn!("Checkpoint has no weight for bridge {}", spec.key()),
            }
        }
        Ok(restored)
    }
}
