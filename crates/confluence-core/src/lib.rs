//! Confluence Core - Types, errors, configuration, and graph topology

pub mod config;
pub mod error;
pub mod topology;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use topology::{default_topology, Topology, TopologyBuilder};
pub use types::*;
