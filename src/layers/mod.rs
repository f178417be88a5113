//! Neural network layer implementations.
//!
//! This module contains the building blocks of the network: the
//! convolutional block primitive, batch normalization, pooling, the dense
//! projection and activation functions.

pub mod activation;
pub mod conv_block;
pub mod dense;
pub mod norm;
pub mod padding;
pub mod pool;

pub use activation::Activation;
pub use conv_block::{BlockOrder, ConvBlock, ConvBlockConfig};
pub use dense::{Dense, DenseConfig};
pub use norm::{Norm, NormConfig};
pub use padding::Padding;
pub use pool::{Pool2d, Pool2dConfig, PoolKind};
