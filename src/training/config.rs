//! Optimizer configuration.

use burn::grad_clipping::GradientClippingConfig;
use burn::optim::AdamConfig;

use crate::densenet::DenseNetConfig;

/// Adam hyper-parameters and per-parameter gradient clipping.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Step size.
    pub learning_rate: f64,
    /// Maximum L2 norm of each parameter's gradient.
    pub clip_norm: f64,
    pub beta_1: f32,
    pub beta_2: f32,
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            clip_norm: 5.0,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl OptimizerConfig {
    /// Creates a new OptimizerConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the learning rate and clipping norm of a model configuration.
    pub fn from_model(config: &DenseNetConfig) -> Self {
        Self::default()
            .learning_rate(config.learning_rate)
            .clip_norm(config.clip_norm)
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the gradient clipping norm.
    pub fn clip_norm(mut self, clip_norm: f64) -> Self {
        self.clip_norm = clip_norm;
        self
    }

    pub fn betas(mut self, beta_1: f32, beta_2: f32) -> Self {
        self.beta_1 = beta_1;
        self.beta_2 = beta_2;
        self
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Burn's Adam configuration with norm clipping applied per parameter.
    pub fn adam(&self) -> AdamConfig {
        AdamConfig::new()
            .with_beta_1(self.beta_1)
            .with_beta_2(self.beta_2)
            .with_epsilon(self.epsilon)
            .with_grad_clipping(Some(GradientClippingConfig::Norm(self.clip_norm as f32)))
    }
}
