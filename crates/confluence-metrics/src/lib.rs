//! Confluence Metrics - compounding analysis, running statistics,
//! online weight learning, and checkpoint persistence

pub mod analyzer;
pub mod checkpoint;
pub mod learner;
pub mod running;

pub use analyzer::{interaction_value, CompoundingAnalysis, CompoundingAnalyzer, SynergyClass};
pub use checkpoint::Checkpoint;
pub use learner::WeightLearner;
pub use running::RunningMetrics;
