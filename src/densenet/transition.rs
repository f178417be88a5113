//! Transition layer between stages: compress channels, halve the spatial size.

use burn::module::Module;
use burn::tensor::{Tensor, backend::Backend};

use super::config::{TRANSITION_POOL, compress};
use crate::errors::ModelError;
use crate::layers::{
    Activation, BlockOrder, ConvBlock, ConvBlockConfig, Pool2d, Pool2dConfig, PoolKind,
};

#[derive(Debug, Clone)]
pub struct TransitionConfig {
    pub input_depth: usize,
    /// Compression factor; output depth is `floor(theta * input_depth)`.
    pub theta: f64,
    pub dropout: f64,
    pub order: BlockOrder,
    pub activation: Activation,
}

impl TransitionConfig {
    pub fn new(input_depth: usize, theta: f64) -> Self {
        Self {
            input_depth,
            theta,
            dropout: 0.2,
            order: BlockOrder::default(),
            activation: Activation::default(),
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_order(mut self, order: BlockOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Depth after compression.
    pub fn output_depth(&self) -> usize {
        compress(self.input_depth, self.theta)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Transition<B>, ModelError> {
        let block = ConvBlockConfig::new(self.input_depth, self.output_depth(), 1)
            .with_dropout(self.dropout)
            .with_order(self.order)
            .with_activation(self.activation)
            .init(device)?;
        let (window, stride) = TRANSITION_POOL;
        let pool = Pool2dConfig::new(PoolKind::Avg, window)
            .with_stride(stride)
            .init()?;

        Ok(Transition { block, pool })
    }
}

#[derive(Module, Debug)]
pub struct Transition<B: Backend> {
    block: ConvBlock<B>,
    pool: Pool2d,
}

impl<B: Backend> Transition<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(self.block.forward(input))
    }

    pub fn output_depth(&self) -> usize {
        self.block.depth()
    }
}
