//! Training utilities.
//!
//! This module provides:
//! - Softmax cross-entropy loss, accuracy and arg-max predictions
//! - Optimizer configuration
//! - The clipped Adam update with a global step counter

mod config;
mod loss;
mod optimizer;

pub use config::OptimizerConfig;
pub use loss::{accuracy, predictions, softmax_cross_entropy};
pub use optimizer::{TrainStep, clip_by_norm};
