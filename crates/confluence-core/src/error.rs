//! Error types for Confluence

use crate::types::LayerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("handler failed on layer {layer}: {message}")]
    HandlerFailed { layer: LayerId, message: String },

    #[error("handler timed out on layer {layer} after {timeout_ms}ms")]
    HandlerTimeout { layer: LayerId, timeout_ms: u64 },

    #[error("no handler registered for layer {0}")]
    MissingHandler(LayerId),

    #[error("config error: {0}")]
    Config(String),

    #[error("topology error: {0}")]
    Topology(String),

    #[error("unknown bridge index: {0}")]
    UnknownBridge(usize),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn handler_failed(layer: LayerId, message: impl Into<String>) -> Self {
        Self::HandlerFailed {
            layer,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn topology(message: impl Into<String>) -> Self {
        Self::Topology(message.into())
    }
}
