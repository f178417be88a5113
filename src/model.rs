//! The trainable DenseNet classifier.
//!
//! [`DenseNetModel`] owns the network, its configuration and the optimizer
//! state. Inputs are NHWC image batches `[batch, height, width, depth]` and
//! label batches `[batch, num_classes]`.
//!
//! In training mode (`trainable = true`) forward passes normalize with batch
//! statistics and apply dropout. Only [`DenseNetModel::train_step`] commits
//! the refreshed moving statistics; fetches leave them untouched. In
//! inference mode the network is evaluated through [`AutodiffModule::valid`],
//! which uses the moving statistics and disables dropout; such a model
//! cannot be trained.

use burn::module::{AutodiffModule, Module};
use burn::tensor::{ElementConversion, Int, Tensor, backend::AutodiffBackend};
use log::{debug, info, warn};

use crate::densenet::{DenseNetConfig, DenseNetwork};
use crate::errors::ModelError;
use crate::training::{self, OptimizerConfig, TrainStep};

/// Scalar results of one evaluation or training step.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetches {
    /// Mean softmax cross-entropy.
    pub loss: f32,
    /// Fraction of correct arg-max predictions.
    pub accuracy: f32,
    /// Predicted class per example.
    pub predictions: Vec<usize>,
}

/// DenseNet with its optimizer state.
pub struct DenseNetModel<B: AutodiffBackend> {
    config: DenseNetConfig,
    network: DenseNetwork<B>,
    /// Same topology with its own moving statistics; training-mode fetches
    /// run here with the current parameters loaded.
    fetch_network: DenseNetwork<B>,
    trainer: TrainStep<B, DenseNetwork<B>>,
}

impl<B: AutodiffBackend> DenseNetModel<B> {
    /// Validates `config` and builds a freshly initialized model.
    pub fn new(config: DenseNetConfig, device: &B::Device) -> Result<Self, ModelError> {
        let network = config.build_network(device)?;
        let fetch_network = config.build_network(device)?;
        let trainer = TrainStep::new(&OptimizerConfig::from_model(&config));

        info!(
            "Built DenseNet: {} parameters, {} head features, input {}x{}x{}, {} classes, {} mode",
            network.num_params(),
            config.flatten_size(),
            config.height,
            config.width,
            config.depth,
            config.num_classes,
            if config.trainable { "training" } else { "inference" }
        );

        Ok(Self {
            config,
            network,
            fetch_network,
            trainer,
        })
    }

    pub fn config(&self) -> &DenseNetConfig {
        &self.config
    }

    pub fn network(&self) -> &DenseNetwork<B> {
        &self.network
    }

    /// The network on the inner backend, in inference mode.
    pub fn inference_network(&self) -> DenseNetwork<B::InnerBackend> {
        self.network.valid()
    }

    pub fn is_trainable(&self) -> bool {
        self.config.trainable
    }

    /// Number of optimizer updates applied so far.
    pub fn global_step(&self) -> u64 {
        self.trainer.global_step()
    }

    /// Raw class scores `[batch, num_classes]`.
    pub fn logits(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 2>, ModelError> {
        self.check_images(&images)?;
        Ok(self.forward(images))
    }

    /// Arg-max class index per example, shape `[batch]`.
    pub fn predictions(&self, images: Tensor<B, 4>) -> Result<Tensor<B, 1, Int>, ModelError> {
        Ok(training::predictions(self.logits(images)?))
    }

    /// Computes loss, accuracy and predictions from a single forward pass,
    /// without updating parameters or moving statistics.
    pub fn evaluate(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 2>,
    ) -> Result<Fetches, ModelError> {
        self.check_batch(&images, &labels)?;
        let logits = self.forward(images);
        Ok(fetch(logits, labels))
    }

    /// Runs one optimization step on the batch and returns the fetches
    /// computed before the update.
    ///
    /// Shape errors are reported before anything is computed, leaving the
    /// parameters, moving statistics and step counter unchanged.
    pub fn train_step(
        &mut self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 2>,
    ) -> Result<Fetches, ModelError> {
        if !self.config.trainable {
            warn!("Rejected training batch: model was built in inference mode");
            return Err(ModelError::NotTrainable);
        }
        self.check_batch(&images, &labels)?;

        let logits = self.network.forward(images);
        let loss = training::softmax_cross_entropy(logits.clone(), labels.clone());
        let fetches = fetch(logits, labels);

        self.network = self.trainer.minimize(&self.network, loss)?;
        debug!(
            "Step {}: loss {:.4}, accuracy {:.4}",
            self.trainer.global_step(),
            fetches.loss,
            fetches.accuracy
        );
        Ok(fetches)
    }

    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        if self.config.trainable {
            // Batch-norm records its statistic update into whichever running
            // state the forward goes through; keep it off `self.network`.
            self.fetch_network
                .clone()
                .load_record(self.network.clone().into_record())
                .forward(images)
        } else {
            Tensor::from_inner(self.network.valid().forward(images.inner()))
        }
    }

    fn check_images(&self, images: &Tensor<B, 4>) -> Result<(), ModelError> {
        let [batch, height, width, depth] = images.dims();
        if batch == 0 {
            warn!("Rejected empty batch of shape {:?}", images.dims());
            return Err(ModelError::EmptyBatch);
        }
        let expected = [batch, self.config.height, self.config.width, self.config.depth];
        if [batch, height, width, depth] != expected {
            warn!("Rejected images of shape {:?}", images.dims());
            return Err(ModelError::ShapeMismatch {
                what: "images",
                expected: expected.to_vec(),
                actual: images.dims().to_vec(),
            });
        }
        Ok(())
    }

    fn check_batch(&self, images: &Tensor<B, 4>, labels: &Tensor<B, 2>) -> Result<(), ModelError> {
        self.check_images(images)?;
        let [batch, ..] = images.dims();
        let expected = [batch, self.config.num_classes];
        if labels.dims() != expected {
            warn!("Rejected labels of shape {:?}", labels.dims());
            return Err(ModelError::ShapeMismatch {
                what: "labels",
                expected: expected.to_vec(),
                actual: labels.dims().to_vec(),
            });
        }
        Ok(())
    }
}

fn fetch<B: AutodiffBackend>(logits: Tensor<B, 2>, labels: Tensor<B, 2>) -> Fetches {
    let loss = training::softmax_cross_entropy(logits.clone(), labels.clone());
    let accuracy = training::accuracy(logits.clone(), labels);
    let predictions = training::predictions(logits)
        .into_data()
        .iter::<i64>()
        .map(|class| class as usize)
        .collect();

    Fetches {
        loss: loss.into_scalar().elem::<f32>(),
        accuracy: accuracy.into_scalar().elem::<f32>(),
        predictions,
    }
}
