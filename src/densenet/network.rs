//! The full DenseNet forward graph.

use burn::module::Module;
use burn::tensor::{Tensor, backend::Backend};
use log::debug;

use super::block::{DenseBlock, DenseBlockConfig};
use super::config::{DenseNetConfig, HEAD_POOL, STEM_POOL};
use super::transition::{Transition, TransitionConfig};
use crate::errors::ModelError;
use crate::layers::{
    Activation, ConvBlock, ConvBlockConfig, Dense, DenseConfig, Norm, NormConfig, Pool2d,
    Pool2dConfig, PoolKind,
};

/// A run of dense blocks, each concatenating its output onto the running
/// feature map, optionally followed by a transition layer.
#[derive(Module, Debug)]
pub struct DenseStage<B: Backend> {
    blocks: Vec<DenseBlock<B>>,
    transition: Option<Transition<B>>,
}

impl<B: Backend> DenseStage<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut features = input;
        for block in &self.blocks {
            let grown = block.forward(features.clone());
            features = Tensor::cat(vec![features, grown], 1);
        }
        match &self.transition {
            Some(transition) => transition.forward(features),
            None => features,
        }
    }

    pub fn blocks(&self) -> &[DenseBlock<B>] {
        &self.blocks
    }

    pub fn transition(&self) -> Option<&Transition<B>> {
        self.transition.as_ref()
    }
}

/// DenseNet classifier: stem, dense stages, final normalization and a
/// pooled linear head producing raw class logits.
#[derive(Module, Debug)]
pub struct DenseNetwork<B: Backend> {
    stem: ConvBlock<B>,
    stem_pool: Pool2d,
    stages: Vec<DenseStage<B>>,
    final_norm: Norm<B>,
    head_pool: Pool2d,
    classifier: Dense<B>,
    activation_id: u8,
}

impl DenseNetConfig {
    /// Validates the configuration and builds the network on `device`.
    pub fn build_network<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<DenseNetwork<B>, ModelError> {
        self.validate()?;

        let stem = ConvBlockConfig::new(self.depth, self.stem_depth, self.stem_kernel)
            .with_stride(self.stem_stride)
            .with_dropout(self.dropout)
            .with_order(self.block_order)
            .with_activation(self.activation)
            .init(device)?;
        let stem_pool = Pool2dConfig::new(PoolKind::Max, STEM_POOL.0)
            .with_stride(STEM_POOL.1)
            .init()?;

        let plan = self.channel_plan();
        let mut stages = Vec::with_capacity(plan.stages.len());
        for stage_plan in &plan.stages {
            let blocks = (0..self.layers_per_stage)
                .map(|index| {
                    DenseBlockConfig::new(stage_plan.input + index * self.growth_rate, self.growth_rate)
                        .with_dropout(self.dropout)
                        .with_order(self.block_order)
                        .with_activation(self.activation)
                        .init(device)
                })
                .collect::<Result<Vec<_>, _>>()?;

            let transition = match stage_plan.transition {
                Some(_) => Some(
                    TransitionConfig::new(stage_plan.output, self.theta)
                        .with_dropout(self.dropout)
                        .with_order(self.block_order)
                        .with_activation(self.activation)
                        .init(device)?,
                ),
                None => None,
            };
            debug!(
                "Stage {}: {} -> {} channels, transition {:?}",
                stages.len() + 1,
                stage_plan.input,
                stage_plan.output,
                stage_plan.transition
            );
            stages.push(DenseStage { blocks, transition });
        }

        let final_norm = NormConfig::new(plan.final_depth()).init(device);
        let head_pool = Pool2dConfig::new(PoolKind::Avg, HEAD_POOL.0)
            .with_stride(HEAD_POOL.1)
            .init()?;
        let classifier = DenseConfig::new(self.flatten_size(), self.num_classes).init(device);

        Ok(DenseNetwork {
            stem,
            stem_pool,
            stages,
            final_norm,
            head_pool,
            classifier,
            activation_id: self.activation.to_id(),
        })
    }
}

impl<B: Backend> DenseNetwork<B> {
    /// Maps NHWC images `[batch, height, width, depth]` to logits
    /// `[batch, num_classes]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = images.permute([0, 3, 1, 2]);
        let x = self.stem_pool.forward(self.stem.forward(x));

        let x = self
            .stages
            .iter()
            .fold(x, |features, stage| stage.forward(features));

        let x = self.activation().apply(self.final_norm.forward(x));
        let x = self.head_pool.forward(x);
        self.classifier.forward(x.flatten::<2>(1, 3))
    }

    /// Nonlinearity used by every block and after the final normalization.
    pub fn activation(&self) -> Activation {
        Activation::from_id(self.activation_id)
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.output_size()
    }

    pub fn stem(&self) -> &ConvBlock<B> {
        &self.stem
    }

    pub fn stages(&self) -> &[DenseStage<B>] {
        &self.stages
    }

    pub fn final_norm(&self) -> &Norm<B> {
        &self.final_norm
    }

    pub fn classifier(&self) -> &Dense<B> {
        &self.classifier
    }
}
