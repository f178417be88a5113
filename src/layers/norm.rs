//! Batch normalization over the channel axis of NCHW feature maps.

use burn::module::Module;
use burn::nn::{BatchNorm, BatchNormConfig};
use burn::tensor::{Tensor, backend::Backend};

/// Configuration for a [`Norm`] layer.
///
/// `momentum` uses the decay convention (fraction of the old moving
/// average kept per update), i.e. `0.99` keeps 99% of the running mean.
#[derive(Debug, Clone)]
pub struct NormConfig {
    /// Number of channels.
    pub num_features: usize,
    /// Moving average decay.
    pub momentum: f64,
    /// Variance epsilon.
    pub epsilon: f64,
    /// Whether the scale (gamma) is learned. When false gamma stays at 1.
    pub scale: bool,
}

impl NormConfig {
    /// Creates a config with decay 0.99, epsilon 1e-3 and a learned scale.
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            momentum: 0.99,
            epsilon: 1e-3,
            scale: true,
        }
    }

    /// Sets whether gamma is trainable.
    pub fn with_scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the moving average decay.
    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    /// Sets the variance epsilon.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Initializes the layer on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Norm<B> {
        // Burn weighs the *new* batch statistic by `momentum`.
        let mut batch_norm = BatchNormConfig::new(self.num_features)
            .with_momentum(1.0 - self.momentum)
            .with_epsilon(self.epsilon)
            .init(device);

        if !self.scale {
            batch_norm.gamma = batch_norm.gamma.set_require_grad(false);
        }

        Norm {
            batch_norm,
            num_features: self.num_features,
            scale: self.scale,
        }
    }
}

/// Batch normalization with learned shift and optional learned scale.
///
/// On an autodiff backend the layer normalizes with batch statistics and
/// refreshes its moving mean/variance on every forward pass. On an inner
/// (inference) backend it normalizes with the moving statistics.
#[derive(Module, Debug)]
pub struct Norm<B: Backend> {
    batch_norm: BatchNorm<B, 2>,
    num_features: usize,
    scale: bool,
}

impl<B: Backend> Norm<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.batch_norm.forward(input)
    }

    /// Returns the number of normalized channels.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Returns whether gamma is trainable.
    pub fn has_scale(&self) -> bool {
        self.scale
    }

    /// Current moving mean, one value per channel.
    pub fn running_mean(&self) -> Vec<f32> {
        self.batch_norm
            .running_mean
            .value_sync()
            .to_data()
            .to_vec()
            .unwrap_or_default()
    }

    /// Current moving variance, one value per channel.
    pub fn running_var(&self) -> Vec<f32> {
        self.batch_norm
            .running_var
            .value_sync()
            .to_data()
            .to_vec()
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn gamma(&self) -> &burn::module::Param<Tensor<B, 1>> {
        &self.batch_norm.gamma
    }
}
