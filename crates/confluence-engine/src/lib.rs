//! Confluence Engine - layer handlers and the integration loop

pub mod engine;
pub mod handlers;

pub use engine::IntegrationEngine;
pub use handlers::{
    create_default_registry, BlendHandler, GateHandler, HandlerRegistry, LayerHandler,
    SignalHandler,
};
