//! # densenet
//!
//! A DenseNet image classifier built on the Burn framework.
//!
//! The network takes NHWC image batches and produces class logits through a
//! 7x7 stem convolution and max pool, three stages of densely connected
//! bottleneck blocks separated by compressing transition layers, a final
//! batch norm and ReLU, and a pooled linear head. Training uses Adam with
//! every parameter's gradient clipped to an L2 norm of 5 and a global step
//! counter.
//!
//! ## Features
//!
//! - **Burn Backend**: WGPU for acceleration, NdArray for CPU and tests.
//! - **TensorFlow-style padding**: "same" convolutions and pools with
//!   asymmetric borders, so a 28x28 input reduces to 14, 7, 4, 2 and 1.
//! - **JSON configuration**: [`DenseNetConfig`] can be saved and loaded.
//!
//! ## Example
//!
//! ```
//! use densenet::prelude::*;
//! use burn::backend::{Autodiff, NdArray};
//! use burn::tensor::Tensor;
//!
//! type Backend = Autodiff<NdArray>;
//!
//! let device = <Backend as burn::tensor::backend::Backend>::Device::default();
//! let model = DenseNetModel::<Backend>::new(DenseNetConfig::small(), &device)
//!     .expect("Failed to build model");
//!
//! let images = Tensor::<Backend, 4>::zeros([2, 28, 28, 1], &device);
//! let logits = model.logits(images).unwrap();
//! assert_eq!(logits.dims(), [2, 10]);
//! ```

pub mod densenet;
pub mod errors;
pub mod layers;
pub mod model;
pub mod training;

// Re-exports for convenience
pub use densenet::{DenseNetConfig, DenseNetwork};
pub use errors::ModelError;
pub use layers::activation::Activation;
pub use model::{DenseNetModel, Fetches};
pub use training::OptimizerConfig;

/// Backend type alias for WGPU with autodiff support.
pub type Backend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backend type for inference (no autodiff).
pub type InferenceBackend = burn::backend::Wgpu;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::densenet::{DenseNetConfig, DenseNetwork};
    pub use crate::errors::ModelError;
    pub use crate::layers::{Activation, BlockOrder};
    pub use crate::model::{DenseNetModel, Fetches};
    pub use crate::training::{OptimizerConfig, TrainStep};
    pub use crate::{Backend, InferenceBackend};
}
