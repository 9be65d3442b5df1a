//! End-to-end pipeline tests: integrate → analyze → learn over the full
//! workspace surface, including the two reference scenarios.
//!
//! The analyzer reads final (post-amplification) confidences; with k = 0
//! the readings are identical to pre-amplification ones, which is what
//! pins the bridgeless scenario to a factor of exactly 1.

use confluence_core::{
    default_topology, EngineConfig, LayerId, RunInput, Termination, Topology,
};
use confluence_engine::{create_default_registry, HandlerRegistry, IntegrationEngine, SignalHandler};
use confluence_metrics::{Checkpoint, CompoundingAnalyzer, SynergyClass, WeightLearner};

fn signal_registry(layers: &[LayerId]) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for layer in layers {
        registry.register(*layer, Box::new(SignalHandler { gain: 1.0 }));
    }
    registry
}

// ===========================================================================
// Reference scenario: three equal layers, no bridges
// ===========================================================================

#[test]
fn bridgeless_uniform_stack_reports_factor_one_unclassified() {
    let registry = signal_registry(&[LayerId::Base, LayerId::Extended, LayerId::Language]);
    let engine =
        IntegrationEngine::new(EngineConfig::default(), Topology::empty(), registry).unwrap();
    let analyzer = CompoundingAnalyzer::new(EngineConfig::default().analysis);

    let result = engine.run(&RunInput::signal(0.6)).unwrap();
    let analysis = analyzer.analyze(&result);

    assert!((analysis.arithmetic_mean - 0.6).abs() < 1e-12);
    assert!((analysis.geometric_mean - 0.6).abs() < 1e-12);
    assert!((analysis.compounding_factor - 1.0).abs() < 1e-9);
    assert!(!analysis.is_beneficial);
    assert_eq!(analysis.classification, SynergyClass::Unclassified);
}

// ===========================================================================
// Reference scenario: hot bridge crosses the resonance threshold
// ===========================================================================

#[test]
fn saturated_bridge_classifies_resonance() {
    // k at the safe bound with both layers at 0.9: the boost passes 1.5
    // on the second iteration once confidences amplify above 1.
    let topo = Topology::builder()
        .bridge(LayerId::Base, LayerId::Extended, 1.0, 1.0)
        .build()
        .unwrap();
    let mut config = EngineConfig::default();
    config.amplification.k = 0.5;
    config.convergence.max_iterations = 10;
    let registry = signal_registry(&[LayerId::Base, LayerId::Extended]);
    let engine = IntegrationEngine::new(config.clone(), topo, registry).unwrap();
    let analyzer = CompoundingAnalyzer::new(config.analysis);

    let result = engine.run(&RunInput::signal(0.9)).unwrap();
    let analysis = analyzer.analyze(&result);

    assert!(result.bridges[0].amplification > 1.5);
    assert_eq!(analysis.classification, SynergyClass::Resonance);
    // Runaway growth stops at the sanity ceiling, never silently above it.
    for c in result.confidences() {
        assert!(c <= config.amplification.sanity_ceiling);
    }
}

// ===========================================================================
// Full default stack: run → analyze → learn → checkpoint
// ===========================================================================

#[test]
fn default_stack_full_cycle() {
    let config = EngineConfig::default();
    let engine = IntegrationEngine::new(
        config.clone(),
        default_topology(),
        create_default_registry(),
    )
    .unwrap();
    let analyzer = CompoundingAnalyzer::new(config.analysis.clone());
    let learner = WeightLearner::new(config.learning.rate, engine.weights());

    for _ in 0..3 {
        let result = engine.run(&RunInput::signal(0.7)).unwrap();
        assert_eq!(result.layers.len(), 7);
        assert!(matches!(
            result.termination,
            Termination::Converged | Termination::CapReached | Termination::Diverged
        ));

        let analysis = analyzer.analyze(&result);
        assert!(analysis.arithmetic_mean.is_finite());
        assert!(analysis.geometric_mean >= 0.0);

        let updates = learner.learn_from(&result, &analysis).unwrap();
        assert_eq!(updates.len(), engine.topology().bridge_count());
        for (_, weight) in updates {
            assert!((0.0..=1.0).contains(&weight));
        }
    }

    let metrics = analyzer.running_metrics();
    assert_eq!(metrics.samples, 3);
    assert_eq!(metrics.per_layer.len(), 7);

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    Checkpoint::capture(engine.topology(), &engine.weights(), metrics)
        .save(&path)
        .unwrap();

    let loaded = Checkpoint::load(&path).unwrap();
    assert_eq!(loaded.metrics.samples, 3);
    assert_eq!(loaded.weights.len(), engine.topology().bridge_count());
}

// ===========================================================================
// Learner feedback shifts weights between runs
// ===========================================================================

#[test]
fn weights_drift_under_repeated_learning() {
    let topo = Topology::builder()
        .bridge(LayerId::Base, LayerId::Extended, 0.8, 0.5)
        .build()
        .unwrap();
    let registry = signal_registry(&[LayerId::Base, LayerId::Extended]);
    let config = EngineConfig::default();
    let engine = IntegrationEngine::new(config.clone(), topo, registry).unwrap();
    let analyzer = CompoundingAnalyzer::new(config.analysis.clone());
    let learner = WeightLearner::new(config.learning.rate, engine.weights());

    let before = engine.weights().snapshot()[0];
    for _ in 0..5 {
        let result = engine.run(&RunInput::signal(0.4)).unwrap();
        let analysis = analyzer.analyze(&result);
        learner.learn_from(&result, &analysis).unwrap();
    }
    let after = engine.weights().snapshot()[0];

    // Predicted interaction is negative for clamped weights (AM-GM) and
    // emergence is ~0 for a near-uniform pair, so the weight climbs.
    assert!(after > before, "weight did not move: {before} -> {after}");
    assert!((0.0..=1.0).contains(&after));
}
