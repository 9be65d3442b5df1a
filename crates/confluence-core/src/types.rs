//! Core types for Confluence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A fixed layer identity in the fusion graph.
///
/// The layer set is closed: every run holds exactly one [`LayerState`] per
/// configured layer, and the bridge topology is wired against these
/// identities at construction time.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    Base,
    Extended,
    CrossDomain,
    Intuition,
    Language,
    Collaborative,
    External,
}

impl LayerId {
    /// All layers in seeding order.
    pub const ALL: [LayerId; 7] = [
        LayerId::Base,
        LayerId::Extended,
        LayerId::CrossDomain,
        LayerId::Intuition,
        LayerId::Language,
        LayerId::Collaborative,
        LayerId::External,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayerId::Base => "base",
            LayerId::Extended => "extended",
            LayerId::CrossDomain => "cross_domain",
            LayerId::Intuition => "intuition",
            LayerId::Language => "language",
            LayerId::Collaborative => "collaborative",
            LayerId::External => "external",
        }
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Run identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunId(Arc<str>);

impl RunId {
    pub fn generate() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input to one integration run. The engine never inspects `content`;
/// it is handed to layer handlers as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunInput {
    /// Raw signal strength, nominally in [0, 1].
    pub signal: f64,
    /// Opaque domain content for handlers.
    #[serde(default)]
    pub content: serde_json::Value,
}

impl RunInput {
    pub fn signal(signal: f64) -> Self {
        Self {
            signal,
            content: serde_json::Value::Null,
        }
    }

    pub fn with_content(signal: f64, content: serde_json::Value) -> Self {
        Self { signal, content }
    }
}

/// The value flowing through the graph: one confidence score plus an
/// opaque payload.
///
/// Confidence is never negative. It starts in [0, 1] at seed time but may
/// exceed 1 after amplification — that overshoot is what the compounding
/// metrics measure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerState {
    confidence: f64,
    pub payload: serde_json::Value,
}

impl LayerState {
    /// Build a state, clamping negative confidence to 0.
    pub fn new(confidence: f64, payload: serde_json::Value) -> Self {
        Self {
            confidence: confidence.max(0.0),
            payload,
        }
    }

    pub fn with_confidence(confidence: f64) -> Self {
        Self::new(confidence, serde_json::Value::Null)
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Replace the confidence, clamping at 0.
    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = confidence.max(0.0);
    }
}

/// Index of a bridge within its topology. Stable for the lifetime of the
/// topology — checkpoints and the learner address bridges by it.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BridgeId(pub usize);

impl BridgeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BridgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Static description of one bridge: the ordered layer pair plus its
/// calibrated resonance constant and the starting interaction weight.
///
/// Only the interaction weight ever changes after construction, and only
/// through the weight learner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeSpec {
    pub source: LayerId,
    pub target: LayerId,
    /// Calibrated constant in [0, 1].
    pub base_resonance: f64,
    /// Starting interaction weight in [0, 1].
    pub initial_weight: f64,
}

impl BridgeSpec {
    /// Stable string key for checkpoints and per-bridge statistics.
    pub fn key(&self) -> String {
        format!("{}->{}", self.source, self.target)
    }
}

/// How a run terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Max confidence change dropped below epsilon.
    Converged,
    /// Iteration cap reached. Not an error.
    CapReached,
    /// Mean confidence decreased (or the sanity ceiling was crossed);
    /// the result holds the last non-degrading snapshot.
    Diverged,
}

/// Per-bridge record attached to a [`StackResult`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeReport {
    pub id: BridgeId,
    pub source: LayerId,
    pub target: LayerId,
    /// Interaction weight the run was executed with.
    pub weight: f64,
    /// Largest amplification boost this bridge produced during the run.
    pub amplification: f64,
}

/// Immutable outcome of one integration run. Owned by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StackResult {
    pub run_id: RunId,
    pub layers: BTreeMap<LayerId, LayerState>,
    pub iterations: usize,
    pub termination: Termination,
    pub bridges: Vec<BridgeReport>,
}

impl StackResult {
    pub fn confidence(&self, layer: LayerId) -> Option<f64> {
        self.layers.get(&layer).map(|s| s.confidence())
    }

    /// Final confidences in layer order.
    pub fn confidences(&self) -> Vec<f64> {
        self.layers.values().map(|s| s.confidence()).collect()
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Shared bridge weight table.
///
/// The engine takes read snapshots at run start; the weight learner is the
/// single writer. Indexed by [`BridgeId`].
#[derive(Clone, Debug)]
pub struct SharedWeights {
    inner: Arc<RwLock<Vec<f64>>>,
}

impl SharedWeights {
    pub fn new(initial: Vec<f64>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Copy of all weights, in bridge order.
    pub fn snapshot(&self) -> Vec<f64> {
        self.read().clone()
    }

    pub fn get(&self, id: BridgeId) -> Option<f64> {
        self.read().get(id.index()).copied()
    }

    /// Overwrite one weight, clamped to [0, 1]. Returns the stored value.
    pub fn set(&self, id: BridgeId, weight: f64) -> crate::Result<f64> {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = guard
            .get_mut(id.index())
            .ok_or(crate::Error::UnknownBridge(id.index()))?;
        *slot = weight.clamp(0.0, 1.0);
        Ok(*slot)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<f64>> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
