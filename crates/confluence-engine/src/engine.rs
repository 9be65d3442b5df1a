//! IntegrationEngine — bidirectional iterative refinement to a fixed point
//!
//! One run: seed every configured layer from its handler, then repeat
//! forward/backward/amplification over every bridge until the stack
//! converges, hits the iteration cap, or starts degrading. All bridge
//! updates within an iteration are computed from the start-of-iteration
//! snapshot and applied together, so results never depend on bridge order.

use crate::handlers::HandlerRegistry;
use confluence_core::{
    BridgeId, BridgeReport, BridgeSpec, EngineConfig, Error, LayerId, LayerState, Result, RunId,
    RunInput, SharedWeights, StackResult, Termination, Topology,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Rounding headroom for the mean-decrease divergence check. Symmetric
/// relaxation at k = 0 preserves the mean exactly; without this the abort
/// could fire on floating-point noise.
const DIVERGENCE_TOLERANCE: f64 = 1e-9;

/// The integration engine. Topology and handlers are read-only
/// configuration shared across runs; each run owns its own transient
/// layer states, so runs may execute fully in parallel.
pub struct IntegrationEngine {
    config: EngineConfig,
    topology: Arc<Topology>,
    weights: SharedWeights,
    registry: HandlerRegistry,
}

impl std::fmt::Debug for IntegrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationEngine").finish_non_exhaustive()
    }
}

impl IntegrationEngine {
    /// Validate configuration and wiring, then freeze the engine.
    /// Stability violations surface here, never at run time.
    pub fn new(
        config: EngineConfig,
        topology: Topology,
        registry: HandlerRegistry,
    ) -> Result<Self> {
        config.validate()?;
        if registry.is_empty() {
            return Err(Error::config("no layers registered"));
        }
        for (_, spec) in topology.bridges() {
            for endpoint in [spec.source, spec.target] {
                if !registry.contains(endpoint) {
                    return Err(Error::config(format!(
                        "bridge {} references layer {} with no handler",
                        spec.key(),
                        endpoint
                    )));
                }
            }
        }
        let weights = SharedWeights::new(topology.initial_weights());
        Ok(Self {
            config,
            topology: Arc::new(topology),
            weights,
            registry,
        })
    }

    /// Handle to the shared weight table, for the weight learner.
    pub fn weights(&self) -> SharedWeights {
        self.weights.clone()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one integration run.
    ///
    /// Handler failures abort the run and surface as errors; divergence
    /// does not — it comes back as a [`StackResult`] with
    /// [`Termination::Diverged`] holding the last non-degrading snapshot.
    pub fn run(&self, input: &RunInput) -> Result<StackResult> {
        let run_id = RunId::generate();
        let mut states = self.seed(input)?;

        // Weights are snapshotted once per run; the learner may update the
        // shared table between runs, never mid-run.
        let weight_snapshot = self.weights.snapshot();
        let bridges: Vec<(BridgeId, &BridgeSpec, f64)> = self
            .topology
            .bridges()
            .map(|(id, spec)| (id, spec, weight_snapshot[id.index()]))
            .collect();

        let mut max_boost = vec![1.0_f64; self.topology.bridge_count()];
        let k = self.config.amplification.k;
        let ceiling = self.config.amplification.sanity_ceiling;
        let epsilon = self.config.convergence.epsilon;
        let cap = self.config.convergence.max_iterations;

        let mut iterations = 0;
        let termination;

        loop {
            iterations += 1;
            let snapshot: BTreeMap<LayerId, f64> = states
                .iter()
                .map(|(l, s)| (*l, s.confidence()))
                .collect();
            let prev_mean = mean(snapshot.values().copied());

            let mut nudge: BTreeMap<LayerId, f64> = BTreeMap::new();
            let mut boost_factor: BTreeMap<LayerId, f64> = BTreeMap::new();

            for (id, spec, weight) in &bridges {
                let ci = snapshot[&spec.source];
                let cj = snapshot[&spec.target];

                // Forward and backward contributions pull each endpoint
                // toward the other; mean-preserving when k = 0.
                let coupling = 0.5 * spec.base_resonance * weight;
                *nudge.entry(spec.target).or_insert(0.0) += coupling * (ci - cj);
                *nudge.entry(spec.source).or_insert(0.0) += coupling * (cj - ci);

                let resonance = (ci * cj).sqrt();
                let boost = 1.0 + resonance * k;
                *boost_factor.entry(spec.source).or_insert(1.0) *= boost;
                *boost_factor.entry(spec.target).or_insert(1.0) *= boost;
                if boost > max_boost[id.index()] {
                    max_boost[id.index()] = boost;
                }
            }

            // Apply the iteration's updates together.
            let mut max_change = 0.0_f64;
            let mut ceiling_hit = false;
            for (layer, state) in states.iter_mut() {
                let old = snapshot[layer];
                let nudged = old + nudge.get(layer).copied().unwrap_or(0.0);
                let amplified =
                    (nudged * boost_factor.get(layer).copied().unwrap_or(1.0)).max(0.0);
                if amplified > ceiling {
                    ceiling_hit = true;
                }
                state.set_confidence(amplified);
                max_change = max_change.max((amplified - old).abs());
            }
            let new_mean = mean(states.values().map(|s| s.confidence()));

            debug!(
                iteration = iterations,
                max_change, prev_mean, new_mean, "refinement step"
            );

            if ceiling_hit {
                restore(&mut states, &snapshot);
                debug!(ceiling, "confidence crossed sanity ceiling, aborting");
                termination = Termination::Diverged;
                break;
            }
            if max_change < epsilon {
                termination = Termination::Converged;
                break;
            }
            if iterations >= cap {
                termination = Termination::CapReached;
                break;
            }
            if new_mean + DIVERGENCE_TOLERANCE < prev_mean {
                restore(&mut states, &snapshot);
                termination = Termination::Diverged;
                break;
            }
        }

        let bridge_reports = bridges
            .iter()
            .map(|(id, spec, weight)| BridgeReport {
                id: *id,
                source: spec.source,
                target: spec.target,
                weight: *weight,
                amplification: max_boost[id.index()],
            })
            .collect();

        let result = StackResult {
            run_id,
            layers: states,
            iterations,
            termination,
            bridges: bridge_reports,
        };
        info!(
            run_id = %result.run_id,
            iterations = result.iterations,
            termination = ?result.termination,
            "integration run complete"
        );
        Ok(result)
    }

    /// Seed every configured layer in fixed order. Upstream states are the
    /// already-seeded bridge neighbors, so payloads cross bridges here.
    fn seed(&self, input: &RunInput) -> Result<BTreeMap<LayerId, LayerState>> {
        let mut states: BTreeMap<LayerId, LayerState> = BTreeMap::new();
        for layer in self.registry.layers() {
            let handler = self
                .registry
                .get(layer)
                .ok_or(Error::MissingHandler(layer))?;
            let upstream: Vec<&LayerState> = self
                .topology
                .neighbors(layer)
                .into_iter()
                .filter_map(|n| states.get(&n))
                .collect();
            let state = handler.handle(layer, input, &upstream)?;
            debug!(layer = %layer, handler = handler.name(), confidence = state.confidence(), "seeded");
            states.insert(layer, state);
        }
        Ok(states)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Roll the layer confidences back to a snapshot (divergence abort keeps
/// the last non-degrading state).
fn restore(states: &mut BTreeMap<LayerId, LayerState>, snapshot: &BTreeMap<LayerId, f64>) {
    for (layer, state) in states.iter_mut() {
        state.set_confidence(snapshot[layer]);
    }
}
