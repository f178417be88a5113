//! Dense block: a 1x1 bottleneck followed by a 3x3 convolution.

use burn::module::Module;
use burn::tensor::{Tensor, backend::Backend};

use super::config::BOTTLENECK_FACTOR;
use crate::errors::ModelError;
use crate::layers::{Activation, BlockOrder, ConvBlock, ConvBlockConfig};

/// Configuration for a [`DenseBlock`].
#[derive(Debug, Clone)]
pub struct DenseBlockConfig {
    /// Channels of the accumulated feature map entering the block.
    pub input_depth: usize,
    /// Channels the block contributes (k).
    pub growth_rate: usize,
    pub dropout: f64,
    pub order: BlockOrder,
    pub activation: Activation,
}

impl DenseBlockConfig {
    pub fn new(input_depth: usize, growth_rate: usize) -> Self {
        Self {
            input_depth,
            growth_rate,
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

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DenseBlock<B>, ModelError> {
        let bottleneck_depth = BOTTLENECK_FACTOR * self.growth_rate;

        let bottleneck = ConvBlockConfig::new(self.input_depth, bottleneck_depth, 1)
            .with_dropout(self.dropout)
            .with_order(self.order)
            .with_activation(self.activation)
            .init(device)?;
        let conv = ConvBlockConfig::new(bottleneck_depth, self.growth_rate, 3)
            .with_dropout(self.dropout)
            .with_order(self.order)
            .with_activation(self.activation)
            .init(device)?;

        Ok(DenseBlock { bottleneck, conv })
    }
}

/// Produces `growth_rate` new channels from the accumulated feature map.
///
/// The block only returns its own output; the stage concatenates it onto
/// the accumulator.
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    bottleneck: ConvBlock<B>,
    conv: ConvBlock<B>,
}

impl<B: Backend> DenseBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(self.bottleneck.forward(input))
    }

    /// Channels added by this block.
    pub fn growth_rate(&self) -> usize {
        self.conv.depth()
    }

    pub fn bottleneck(&self) -> &ConvBlock<B> {
        &self.bottleneck
    }
}
