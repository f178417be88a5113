//! DenseNet construction parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::layers::{Activation, BlockOrder, Padding};

/// Window and stride of the max pool after the stem convolution.
pub const STEM_POOL: (usize, usize) = (3, 2);
/// Window and stride of the average pool inside each transition layer.
pub const TRANSITION_POOL: (usize, usize) = (2, 2);
/// Window and stride of the average pool in front of the classifier.
pub const HEAD_POOL: (usize, usize) = (3, 2);
/// Bottleneck width as a multiple of the growth rate.
pub const BOTTLENECK_FACTOR: usize = 4;

/// Configuration for the DenseNet model.
///
/// Fields are public and every field has a chainable setter of the same
/// name. Defaults reproduce the reference topology: 28x28x1 inputs, 10
/// classes, a 48-channel 7x7/2 stem, three stages of ten dense blocks with
/// growth rate 24, compression 0.5 and dropout 0.2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseNetConfig {
    /// Image height.
    pub height: usize,
    /// Image width.
    pub width: usize,
    /// Image channels.
    pub depth: usize,
    /// Number of classes (label width and logits width).
    pub num_classes: usize,
    /// Training mode (batch statistics, active dropout) versus inference mode.
    pub trainable: bool,
    /// Adam step size.
    pub learning_rate: f64,
    /// Compression factor of the transition layers, in (0, 1].
    pub theta: f64,
    /// Fraction of activations zeroed while training.
    pub dropout: f64,
    /// Output channels of every dense block (k).
    pub growth_rate: usize,
    /// Dense blocks per stage.
    pub layers_per_stage: usize,
    /// Number of stages; a transition layer follows every stage but the last.
    pub num_stages: usize,
    /// Output channels of the stem convolution.
    pub stem_depth: usize,
    /// Kernel edge of the stem convolution.
    pub stem_kernel: usize,
    /// Stride of the stem convolution.
    pub stem_stride: usize,
    /// Sub-operation order of every block primitive.
    pub block_order: BlockOrder,
    /// Nonlinearity of every block primitive and of the final normalization.
    pub activation: Activation,
    /// Maximum L2 norm of each parameter's gradient.
    pub clip_norm: f64,
}

impl Default for DenseNetConfig {
    fn default() -> Self {
        Self {
            height: 28,
            width: 28,
            depth: 1,
            num_classes: 10,
            trainable: true,
            learning_rate: 0.001,
            theta: 0.5,
            dropout: 0.2,
            growth_rate: 24,
            layers_per_stage: 10,
            num_stages: 3,
            stem_depth: 48,
            stem_kernel: 7,
            stem_stride: 2,
            block_order: BlockOrder::NormActConv,
            activation: Activation::Relu,
            clip_norm: 5.0,
        }
    }
}

/// Channel depth at each point of the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlan {
    /// Depth after the stem.
    pub stem: usize,
    /// Per stage: depth entering the stage, depth after its dense blocks,
    /// and depth after its transition layer (if any).
    pub stages: Vec<StagePlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub input: usize,
    pub output: usize,
    pub transition: Option<usize>,
}

impl ChannelPlan {
    /// Depth fed to the final normalization and the head.
    pub fn final_depth(&self) -> usize {
        self.stages
            .last()
            .map(|stage| stage.transition.unwrap_or(stage.output))
            .unwrap_or(self.stem)
    }
}

impl DenseNetConfig {
    /// Creates a new DenseNetConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reduced network (two blocks per stage, growth rate 8) with the
    /// default input shape, for quick experiments and tests.
    pub fn small() -> Self {
        Self {
            growth_rate: 8,
            layers_per_stage: 2,
            stem_depth: 16,
            ..Self::default()
        }
    }

    /// Sets the image height.
    pub fn height(mut self, height: usize) -> Self {
        self.height = height;
        self
    }

    /// Sets the image width.
    pub fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets the image channel count.
    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Sets the number of classes.
    pub fn num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    /// Sets training (true) or inference (false) mode.
    pub fn trainable(mut self, trainable: bool) -> Self {
        self.trainable = trainable;
        self
    }

    /// Sets the learning rate.
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the transition compression factor.
    pub fn theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    /// Sets the dropout probability.
    pub fn dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Sets the growth rate.
    pub fn growth_rate(mut self, growth_rate: usize) -> Self {
        self.growth_rate = growth_rate;
        self
    }

    /// Sets the number of dense blocks per stage.
    pub fn layers_per_stage(mut self, layers: usize) -> Self {
        self.layers_per_stage = layers;
        self
    }

    /// Sets the number of stages.
    pub fn num_stages(mut self, stages: usize) -> Self {
        self.num_stages = stages;
        self
    }

    /// Sets the stem output depth.
    pub fn stem_depth(mut self, depth: usize) -> Self {
        self.stem_depth = depth;
        self
    }

    /// Sets the stem kernel edge.
    pub fn stem_kernel(mut self, kernel: usize) -> Self {
        self.stem_kernel = kernel;
        self
    }

    /// Sets the stem stride.
    pub fn stem_stride(mut self, stride: usize) -> Self {
        self.stem_stride = stride;
        self
    }

    /// Sets the block ordering.
    pub fn block_order(mut self, order: BlockOrder) -> Self {
        self.block_order = order;
        self
    }

    /// Sets the block activation.
    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Sets the gradient clipping norm.
    pub fn clip_norm(mut self, clip_norm: f64) -> Self {
        self.clip_norm = clip_norm;
        self
    }

    /// Checks every parameter; construction fails on the first violation.
    pub fn validate(&self) -> Result<(), ModelError> {
        let dims = [
            ("height", self.height),
            ("width", self.width),
            ("depth", self.depth),
            ("num_classes", self.num_classes),
            ("growth_rate", self.growth_rate),
            ("layers_per_stage", self.layers_per_stage),
            ("num_stages", self.num_stages),
            ("stem_depth", self.stem_depth),
            ("stem_kernel", self.stem_kernel),
            ("stem_stride", self.stem_stride),
        ];
        if let Some((name, _)) = dims.iter().find(|(_, value)| *value == 0) {
            return Err(ModelError::config(format!("{} must be positive", name)));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.theta > 0.0 && self.theta <= 1.0) {
            return Err(ModelError::config(format!(
                "theta must be in (0, 1], got {}",
                self.theta
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.clip_norm.is_finite() && self.clip_norm > 0.0) {
            return Err(ModelError::config(format!(
                "clip_norm must be positive, got {}",
                self.clip_norm
            )));
        }

        let plan = self.channel_plan();
        if let Some(index) = plan.stages.iter().position(|s| s.transition == Some(0)) {
            return Err(ModelError::config(format!(
                "transition after stage {} compresses {} channels to zero (theta {})",
                index + 1,
                plan.stages[index].output,
                self.theta
            )));
        }
        Ok(())
    }

    /// Channel depth after the stem and around every stage.
    pub fn channel_plan(&self) -> ChannelPlan {
        let mut channels = self.stem_depth;
        let mut stages = Vec::with_capacity(self.num_stages);

        for stage in 0..self.num_stages {
            let input = channels;
            channels += self.layers_per_stage * self.growth_rate;
            let output = channels;

            let transition = (stage + 1 < self.num_stages).then(|| compress(output, self.theta));
            if let Some(compressed) = transition {
                channels = compressed;
            }
            stages.push(StagePlan {
                input,
                output,
                transition,
            });
        }

        ChannelPlan {
            stem: self.stem_depth,
            stages,
        }
    }

    /// Spatial `(height, width)` of the feature map entering the classifier.
    pub fn head_spatial(&self) -> (usize, usize) {
        (self.head_length(self.height), self.head_length(self.width))
    }

    fn head_length(&self, input: usize) -> usize {
        let same = |size: usize, (kernel, stride): (usize, usize)| {
            Padding::Same.output_size(size, kernel, stride).unwrap_or(0)
        };

        let mut size = same(input, (self.stem_kernel, self.stem_stride));
        size = same(size, STEM_POOL);
        for _ in 1..self.num_stages {
            size = same(size, TRANSITION_POOL);
        }
        same(size, HEAD_POOL)
    }

    /// Width of the flattened feature vector fed to the classifier.
    pub fn flatten_size(&self) -> usize {
        let (height, width) = self.head_spatial();
        self.channel_plan().final_depth() * height * width
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a configuration from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the configuration to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// `floor(theta * channels)`.
pub(crate) fn compress(channels: usize, theta: f64) -> usize {
    (theta * channels as f64).floor() as usize
}
