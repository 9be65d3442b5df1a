//! Confluence — compounding integration driver
//!
//! Usage:
//!   confluence --runs 5 --signal 0.7 --checkpoint ./confluence-state.json
//!
//! Runs the reference 7-layer stack: integrate → analyze → learn, printing
//! per-run compounding metrics and the running statistics at the end.

use clap::Parser;
use confluence_core::{default_topology, EngineConfig, RunInput};
use confluence_engine::{create_default_registry, IntegrationEngine};
use confluence_metrics::{Checkpoint, CompoundingAnalyzer, WeightLearner};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "confluence", about = "Compounding signal-fusion engine")]
struct Cli {
    /// Path to config file (TOML). Default: ./confluence.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dump default config as TOML and exit.
    #[arg(long)]
    dump_config: bool,

    /// Number of integration runs to execute.
    #[arg(long, default_value_t = 5)]
    runs: usize,

    /// Input signal strength, nominally in [0, 1].
    #[arg(long, default_value_t = 0.7)]
    signal: f64,

    /// Checkpoint file for bridge weights and running metrics.
    /// Loaded at start if present, saved at exit.
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        println!("{}", EngineConfig::default().to_toml());
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "confluence=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("confluence.toml"));
    let config = EngineConfig::load(&config_path);

    let engine = IntegrationEngine::new(
        config.clone(),
        default_topology(),
        create_default_registry(),
    )?;
    let learner = WeightLearner::new(config.learning.rate, engine.weights());

    let analyzer = match cli
        .checkpoint
        .as_deref()
        .filter(|p| p.exists())
        .map(Checkpoint::load)
        .transpose()?
    {
        Some(checkpoint) => {
            let restored = checkpoint.restore_weights(engine.topology(), &engine.weights())?;
            tracing::info!("Restored {} bridge weights from checkpoint", restored);
            CompoundingAnalyzer::with_metrics(config.analysis.clone(), checkpoint.metrics)
        }
        None => CompoundingAnalyzer::new(config.analysis.clone()),
    };

    println!(
        "confluence v{} — 7-layer compounding stack",
        env!("CARGO_PKG_VERSION")
    );

    for run in 1..=cli.runs {
        let result = engine.run(&RunInput::signal(cli.signal))?;
        let analysis = analyzer.analyze(&result);
        learner.learn_from(&result, &analysis)?;

        println!(
            "run {:>3}  [{:?}, {} iters]  am={:.4} gm={:.4} factor={:.4} emergent={:+.4}  {}{}",
            run,
            result.termination,
            result.iterations,
            analysis.arithmetic_mean,
            analysis.geometric_mean,
            analysis.compounding_factor,
            analysis.emergent_value,
            analysis.classification,
            if analysis.is_significant {
                " (significant)"
            } else {
                ""
            },
        );
    }

    let metrics = analyzer.running_metrics();
    println!(
        "\n{} samples  avg factor {:.4}  max factor {:.4}  total emergent {:+.4}",
        metrics.samples,
        metrics.avg_compounding_factor,
        metrics.max_compounding_factor,
        metrics.total_emergent_value,
    );

    if let Some(path) = cli.checkpoint {
        Checkpoint::capture(engine.topology(), &engine.weights(), metrics).save(&path)?;
    }

    Ok(())
}
