//! The convolutional block primitive: normalize, activate, convolve, drop.
//!
//! Two orderings of the same four sub-operations are supported:
//!
//! - [`BlockOrder::NormActConv`]: batch norm → activation → conv → dropout
//!   (pre-activation, the ordering DenseNet uses everywhere).
//! - [`BlockOrder::ConvNormAct`]: conv → batch norm → activation → dropout.
//!
//! Convolutions are stored unpadded; "same" padding is applied explicitly
//! before the convolution (see [`super::padding`]).

use burn::module::{Module, Param};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Dropout, DropoutConfig, Initializer, PaddingConfig2d};
use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use super::norm::{Norm, NormConfig};
use super::padding::{Padding, pad_spatial};
use crate::errors::ModelError;
use crate::layers::Activation;

/// Order of the sub-operations inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockOrder {
    /// Batch norm → activation → convolution → dropout.
    #[default]
    NormActConv,
    /// Convolution → batch norm → activation → dropout.
    ConvNormAct,
}

impl BlockOrder {
    fn to_id(self) -> u8 {
        match self {
            BlockOrder::NormActConv => 0,
            BlockOrder::ConvNormAct => 1,
        }
    }

    fn from_id(id: u8) -> Self {
        match id {
            1 => BlockOrder::ConvNormAct,
            _ => BlockOrder::NormActConv,
        }
    }
}

/// Configuration for a [`ConvBlock`].
#[derive(Debug, Clone)]
pub struct ConvBlockConfig {
    /// Channels of the incoming feature map.
    pub input_depth: usize,
    /// Output channels of the convolution.
    pub depth: usize,
    /// Square kernel edge.
    pub kernel_size: usize,
    /// Convolution stride on both spatial axes.
    pub stride: usize,
    /// Padding mode of the convolution.
    pub padding: Padding,
    /// Nonlinearity; [`Activation::None`] disables it.
    pub activation: Activation,
    /// Whether batch normalization is applied.
    pub batch_norm: bool,
    /// Whether the batch norm learns a scale.
    pub bn_scale: bool,
    /// Fraction of activations zeroed while training.
    pub dropout: f64,
    /// Order of the sub-operations.
    pub order: BlockOrder,
}

impl ConvBlockConfig {
    /// Creates a "same"-padded, stride 1, ReLU block with batch norm and
    /// dropout 0.2.
    pub fn new(input_depth: usize, depth: usize, kernel_size: usize) -> Self {
        Self {
            input_depth,
            depth,
            kernel_size,
            stride: 1,
            padding: Padding::Same,
            activation: Activation::Relu,
            batch_norm: true,
            bn_scale: true,
            dropout: 0.2,
            order: BlockOrder::NormActConv,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_batch_norm(mut self, batch_norm: bool) -> Self {
        self.batch_norm = batch_norm;
        self
    }

    pub fn with_bn_scale(mut self, bn_scale: bool) -> Self {
        self.bn_scale = bn_scale;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_order(mut self, order: BlockOrder) -> Self {
        self.order = order;
        self
    }

    /// Initializes the block with the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ConvBlock<B>, ModelError> {
        if self.input_depth == 0 || self.depth == 0 {
            return Err(ModelError::layer(format!(
                "block depths must be positive (input {}, output {})",
                self.input_depth, self.depth
            )));
        }
        if self.kernel_size == 0 || self.stride == 0 {
            return Err(ModelError::layer(format!(
                "kernel size ({}) and stride ({}) must be positive",
                self.kernel_size, self.stride
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::layer(format!(
                "dropout probability {} is outside [0, 1)",
                self.dropout
            )));
        }

        let mut conv = Conv2dConfig::new(
            [self.input_depth, self.depth],
            [self.kernel_size, self.kernel_size],
        )
        .with_stride([self.stride, self.stride])
        .with_padding(PaddingConfig2d::Valid)
        .with_initializer(Initializer::XavierUniform { gain: 1.0 })
        .init(device);
        conv.bias = Some(Param::from_tensor(Tensor::zeros([self.depth], device)));

        let norm_features = match self.order {
            BlockOrder::NormActConv => self.input_depth,
            BlockOrder::ConvNormAct => self.depth,
        };
        let norm = self.batch_norm.then(|| {
            NormConfig::new(norm_features)
                .with_scale(self.bn_scale)
                .init(device)
        });

        Ok(ConvBlock {
            conv,
            norm,
            dropout: DropoutConfig::new(self.dropout).init(),
            depth: self.depth,
            kernel_size: self.kernel_size,
            stride: self.stride,
            padding_id: self.padding.to_id(),
            activation_id: self.activation.to_id(),
            order_id: self.order.to_id(),
        })
    }
}

/// One block primitive: conv, optional batch norm, optional activation and
/// dropout, in either order.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: Option<Norm<B>>,
    dropout: Dropout,
    depth: usize,
    kernel_size: usize,
    stride: usize,
    padding_id: u8,
    activation_id: u8,
    order_id: u8,
}

impl<B: Backend> ConvBlock<B> {
    /// Applies the block to an NCHW feature map.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = match self.order() {
            BlockOrder::NormActConv => {
                let x = self.normalize(input);
                let x = self.activation().apply(x);
                self.convolve(x)
            }
            BlockOrder::ConvNormAct => {
                let x = self.convolve(input);
                let x = self.normalize(x);
                self.activation().apply(x)
            }
        };
        self.dropout.forward(x)
    }

    fn normalize(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        }
    }

    fn convolve(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = pad_spatial(x, self.padding(), self.kernel_size, self.stride, 0.0);
        self.conv.forward(x)
    }

    /// Returns the output channel count.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn padding(&self) -> Padding {
        Padding::from_id(self.padding_id)
    }

    pub fn activation(&self) -> Activation {
        Activation::from_id(self.activation_id)
    }

    pub fn order(&self) -> BlockOrder {
        BlockOrder::from_id(self.order_id)
    }

    /// Returns the batch norm layer, if enabled.
    pub fn norm(&self) -> Option<&Norm<B>> {
        self.norm.as_ref()
    }

    /// Output spatial length for an input of the given length.
    pub fn output_size(&self, input: usize) -> Option<usize> {
        self.padding()
            .output_size(input, self.kernel_size, self.stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;
    type TrainingBackend = Autodiff<NdArray>;

    #[test]
    fn test_config_defaults() {
        let config = ConvBlockConfig::new(8, 16, 3);
        assert_eq!(config.stride, 1);
        assert_eq!(config.padding, Padding::Same);
        assert_eq!(config.activation, Activation::Relu);
        assert!(config.batch_norm && config.bn_scale);
        assert!((config.dropout - 0.2).abs() < 1e-12);
        assert_eq!(config.order, BlockOrder::NormActConv);
    }

    #[test]
    fn test_same_padding_keeps_spatial_size() {
        let device = <TestBackend as Backend>::Device::default();
        let block: ConvBlock<TestBackend> = ConvBlockConfig::new(3, 5, 3).init(&device).unwrap();

        let output = block.forward(Tensor::<TestBackend, 4>::ones([2, 3, 7, 7], &device));
        assert_eq!(output.dims(), [2, 5, 7, 7]);
        assert_eq!(block.depth(), 5);
    }

    #[test]
    fn test_strided_same_rounds_up() {
        let device = <TestBackend as Backend>::Device::default();
        let block: ConvBlock<TestBackend> = ConvBlockConfig::new(1, 48, 7)
            .with_stride(2)
            .init(&device)
            .unwrap();

        let output = block.forward(Tensor::<TestBackend, 4>::ones([1, 1, 28, 28], &device));
        assert_eq!(output.dims(), [1, 48, 14, 14]);

        let output = block.forward(Tensor::<TestBackend, 4>::ones([1, 1, 7, 7], &device));
        assert_eq!(output.dims(), [1, 48, 4, 4]);
        assert_eq!(block.output_size(7), Some(4));
    }

    #[test]
    fn test_valid_padding_shrinks() {
        let device = <TestBackend as Backend>::Device::default();
        let block: ConvBlock<TestBackend> = ConvBlockConfig::new(2, 4, 3)
            .with_padding(Padding::Valid)
            .init(&device)
            .unwrap();

        let output = block.forward(Tensor::<TestBackend, 4>::ones([1, 2, 6, 6], &device));
        assert_eq!(output.dims(), [1, 4, 4, 4]);
    }

    #[test]
    fn test_norm_width_follows_order() {
        let device = <TestBackend as Backend>::Device::default();

        let pre: ConvBlock<TestBackend> = ConvBlockConfig::new(3, 8, 1).init(&device).unwrap();
        assert_eq!(pre.norm().map(|n| n.num_features()), Some(3));

        let post: ConvBlock<TestBackend> = ConvBlockConfig::new(3, 8, 1)
            .with_order(BlockOrder::ConvNormAct)
            .init(&device)
            .unwrap();
        assert_eq!(post.norm().map(|n| n.num_features()), Some(8));
        assert_eq!(post.order(), BlockOrder::ConvNormAct);

        let output = post.forward(Tensor::<TestBackend, 4>::ones([2, 3, 5, 5], &device));
        assert_eq!(output.dims(), [2, 8, 5, 5]);
    }

    #[test]
    fn test_without_batch_norm() {
        let device = <TestBackend as Backend>::Device::default();
        let block: ConvBlock<TestBackend> = ConvBlockConfig::new(3, 4, 3)
            .with_batch_norm(false)
            .with_activation(Activation::None)
            .init(&device)
            .unwrap();

        assert!(block.norm().is_none());
        assert_eq!(block.activation(), Activation::None);
    }

    #[test]
    fn test_conv_bias_starts_at_zero() {
        let device = <TestBackend as Backend>::Device::default();
        let block: ConvBlock<TestBackend> = ConvBlockConfig::new(3, 4, 3)
            .with_batch_norm(false)
            .with_activation(Activation::None)
            .init(&device)
            .unwrap();

        let bias: Vec<f32> = block
            .conv
            .bias
            .as_ref()
            .map(|bias| bias.val().to_data().to_vec().unwrap())
            .unwrap();
        assert_eq!(bias, vec![0.0; 4]);

        // A zero image through an unbiased convolution stays zero.
        let output = block.forward(Tensor::<TestBackend, 4>::zeros([1, 3, 5, 5], &device));
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        assert!(result.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_relu_after_conv_is_non_negative() {
        let device = <TestBackend as Backend>::Device::default();
        let block: ConvBlock<TestBackend> = ConvBlockConfig::new(2, 4, 3)
            .with_order(BlockOrder::ConvNormAct)
            .with_batch_norm(false)
            .init(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::random(
            [1, 2, 5, 5],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        let result: Vec<f32> = block.forward(input).to_data().to_vec().unwrap();
        assert!(result.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let device = <TestBackend as Backend>::Device::default();

        let zero_depth = ConvBlockConfig::new(3, 0, 3).init::<TestBackend>(&device);
        assert!(matches!(
            zero_depth,
            Err(ModelError::InvalidLayerConfig { .. })
        ));

        let bad_dropout = ConvBlockConfig::new(3, 4, 3)
            .with_dropout(1.0)
            .init::<TestBackend>(&device);
        assert!(matches!(
            bad_dropout,
            Err(ModelError::InvalidLayerConfig { .. })
        ));

        let zero_stride = ConvBlockConfig::new(3, 4, 3)
            .with_stride(0)
            .init::<TestBackend>(&device);
        assert!(zero_stride.is_err());
    }

    #[test]
    fn test_inference_is_deterministic() {
        let device = <TrainingBackend as Backend>::Device::default();
        let block: ConvBlock<TrainingBackend> = ConvBlockConfig::new(2, 4, 3)
            .with_dropout(0.5)
            .init(&device)
            .unwrap();
        let inference = block.valid();

        let input = Tensor::<TestBackend, 4>::random(
            [2, 2, 4, 4],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        let first: Vec<f32> = inference
            .forward(input.clone())
            .to_data()
            .to_vec()
            .unwrap();
        let second: Vec<f32> = inference.forward(input).to_data().to_vec().unwrap();
        assert_eq!(first, second);
    }
}
