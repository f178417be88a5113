//! Model-related error types.

use thiserror::Error;

/// Errors that can occur while building or running a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid layer configuration: {message}")]
    InvalidLayerConfig { message: String },

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Empty batch: at least one example is required")]
    EmptyBatch,

    #[error("No gradients were produced for any trainable parameter")]
    NoGradients,

    #[error("Model was built in inference mode and cannot take optimizer steps")]
    NotTrainable,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub(crate) fn layer(message: impl Into<String>) -> Self {
        Self::InvalidLayerConfig {
            message: message.into(),
        }
    }
}
