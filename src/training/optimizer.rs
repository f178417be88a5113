//! Adam update with a global step counter.

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, GradientsParams, Optimizer};
use burn::tensor::{Tensor, backend::AutodiffBackend, backend::Backend};

use super::OptimizerConfig;
use crate::errors::ModelError;

/// Rescales `grad` so its L2 norm is at most `max_norm`; smaller gradients
/// are returned unchanged.
pub fn clip_by_norm<B: Backend, const D: usize>(grad: Tensor<B, D>, max_norm: f32) -> Tensor<B, D> {
    GradientClippingConfig::Norm(max_norm)
        .init()
        .clip_gradient(grad)
}

/// Applies clipped Adam updates to a module and counts them.
pub struct TrainStep<B: AutodiffBackend, M: AutodiffModule<B>> {
    optimizer: OptimizerAdaptor<Adam, M, B>,
    learning_rate: f64,
    global_step: u64,
}

impl<B: AutodiffBackend, M: AutodiffModule<B>> TrainStep<B, M> {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            optimizer: config.adam().init(),
            learning_rate: config.learning_rate,
            global_step: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Back-propagates `loss` and updates `module`.
    pub fn minimize(&mut self, module: &M, loss: Tensor<B, 1>) -> Result<M, ModelError> {
        let grads = GradientsParams::from_grads(loss.backward(), module);
        self.apply(module, grads)
    }

    /// Updates `module` with `grads` and increments the step counter.
    ///
    /// Fails with [`ModelError::NoGradients`] when no parameter received a
    /// gradient; the module and counter are then left untouched.
    pub fn apply(&mut self, module: &M, grads: GradientsParams) -> Result<M, ModelError> {
        if grads.is_empty() {
            return Err(ModelError::NoGradients);
        }
        let updated = self
            .optimizer
            .step(self.learning_rate, module.clone(), grads);
        self.global_step += 1;
        Ok(updated)
    }
}
