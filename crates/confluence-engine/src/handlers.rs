//! Layer handlers — pluggable per-layer seeding logic
//!
//! A handler is a pure function of (input, upstream states) → LayerState.
//! Concrete capabilities (pattern memory, resonance fields, analogical
//! transfer) live behind this trait; the engine never branches on what a
//! layer actually does. Handlers are selected at configuration time
//! through the registry.

use confluence_core::{Error, LayerId, LayerState, Result, RunInput};
use std::collections::BTreeMap;

/// Capability interface for one layer's content processing.
///
/// Handlers must be synchronous and CPU-bound. A handler that wraps
/// blocking I/O owns its timeout and reports expiry as
/// [`Error::HandlerTimeout`]; the engine aborts the run on any handler
/// error without retrying.
pub trait LayerHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Seed this layer's state from the run input and any already-seeded
    /// upstream neighbors. Confidence must come back non-negative;
    /// [`LayerState::new`] clamps as a backstop.
    fn handle(&self, layer: LayerId, input: &RunInput, upstream: &[&LayerState])
        -> Result<LayerState>;
}

/// Registry mapping each configured layer to its handler.
/// The key set defines the layer set for every run.
pub struct HandlerRegistry {
    handlers: BTreeMap<LayerId, Box<dyn LayerHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, layer: LayerId, handler: Box<dyn LayerHandler>) {
        self.handlers.insert(layer, handler);
    }

    pub fn get(&self, layer: LayerId) -> Option<&dyn LayerHandler> {
        self.handlers.get(&layer).map(|h| h.as_ref())
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        self.handlers.contains_key(&layer)
    }

    /// Configured layers in seeding order.
    pub fn layers(&self) -> Vec<LayerId> {
        LayerId::ALL
            .iter()
            .copied()
            .filter(|l| self.handlers.contains_key(l))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Confidence is the input signal scaled by a fixed gain, capped at 1.
pub struct SignalHandler {
    pub gain: f64,
}

impl LayerHandler for SignalHandler {
    fn name(&self) -> &str {
        "signal"
    }

    fn handle(
        &self,
        layer: LayerId,
        input: &RunInput,
        _upstream: &[&LayerState],
    ) -> Result<LayerState> {
        if !input.signal.is_finite() {
            return Err(Error::handler_failed(layer, "non-finite input signal"));
        }
        let confidence = (input.signal * self.gain).min(1.0);
        Ok(LayerState::new(confidence, input.content.clone()))
    }
}

/// Confidence is the mean of upstream confidences; with no upstream,
/// falls back to the input signal scaled by `fallback_gain`.
pub struct BlendHandler {
    pub fallback_gain: f64,
}

impl LayerHandler for BlendHandler {
    fn name(&self) -> &str {
        "blend"
    }

    fn handle(
        &self,
        _layer: LayerId,
        input: &RunInput,
        upstream: &[&LayerState],
    ) -> Result<LayerState> {
        if upstream.is_empty() {
            let confidence = (input.signal * self.fallback_gain).clamp(0.0, 1.0);
            return Ok(LayerState::new(confidence, input.content.clone()));
        }
        let confidence =
            upstream.iter().map(|s| s.confidence()).sum::<f64>() / upstream.len() as f64;
        let payload = serde_json::Value::Array(
            upstream.iter().map(|s| s.payload.clone()).collect(),
        );
        Ok(LayerState::new(confidence.min(1.0), payload))
    }
}

/// Passes the input signal through when it clears the threshold,
/// otherwise seeds at zero.
pub struct GateHandler {
    pub threshold: f64,
}

impl LayerHandler for GateHandler {
    fn name(&self) -> &str {
        "gate"
    }

    fn handle(
        &self,
        layer: LayerId,
        input: &RunInput,
        _upstream: &[&LayerState],
    ) -> Result<LayerState> {
        if !input.signal.is_finite() {
            return Err(Error::handler_failed(layer, "non-finite input signal"));
        }
        let confidence = if input.signal >= self.threshold {
            input.signal.min(1.0)
        } else {
            0.0
        };
        Ok(LayerState::new(confidence, input.content.clone()))
    }
}

/// Default wiring for the reference 7-layer stack.
pub fn create_default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(LayerId::Base, Box::new(SignalHandler { gain: 1.0 }));
    registry.register(LayerId::Extended, Box::new(SignalHandler { gain: 0.9 }));
    registry.register(
        LayerId::CrossDomain,
        Box::new(BlendHandler { fallback_gain: 0.8 }),
    );
    registry.register(
        LayerId::Intuition,
        Box::new(BlendHandler { fallback_gain: 0.7 }),
    );
    registry.register(LayerId::Language, Box::new(SignalHandler { gain: 0.85 }));
    registry.register(
        LayerId::Collaborative,
        Box::new(BlendHandler { fallback_gain: 0.75 }),
    );
    registry.register(LayerId::External, Box::new(GateHandler { threshold: 0.2 }));
    registry
}
