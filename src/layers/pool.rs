//! 2D max and average pooling with "same" or "valid" windows.

use burn::module::Module;
use burn::tensor::module::{avg_pool2d, max_pool2d};
use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use super::padding::{Padding, pad_spatial};
use crate::errors::ModelError;

/// Reduction applied inside each pooling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Max,
    Avg,
}

/// Configuration for a [`Pool2d`] layer.
#[derive(Debug, Clone)]
pub struct Pool2dConfig {
    /// Reduction type.
    pub kind: PoolKind,
    /// Square window edge.
    pub window: usize,
    /// Step between windows on both spatial axes.
    pub stride: usize,
    /// Padding mode.
    pub padding: Padding,
}

impl PoolKind {
    fn to_id(self) -> u8 {
        match self {
            PoolKind::Max => 0,
            PoolKind::Avg => 1,
        }
    }

    fn from_id(id: u8) -> Self {
        match id {
            0 => PoolKind::Max,
            _ => PoolKind::Avg,
        }
    }
}

impl Pool2dConfig {
    /// Creates a pooling configuration with stride equal to the window.
    pub fn new(kind: PoolKind, window: usize) -> Self {
        Self {
            kind,
            window,
            stride: window,
            padding: Padding::Same,
        }
    }

    /// Sets the stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Sets the padding mode.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Builds the layer.
    pub fn init(&self) -> Result<Pool2d, ModelError> {
        if self.window == 0 || self.stride == 0 {
            return Err(ModelError::layer(format!(
                "pool window ({}) and stride ({}) must be positive",
                self.window, self.stride
            )));
        }
        Ok(Pool2d {
            kind_id: self.kind.to_id(),
            window: self.window,
            stride: self.stride,
            padding_id: self.padding.to_id(),
        })
    }
}

/// Parameter-free pooling layer over NCHW tensors.
///
/// Padded cells never win a max and never count towards an average, so a
/// "same" average at a ragged border is the mean of the real cells only.
#[derive(Module, Clone, Debug)]
pub struct Pool2d {
    kind_id: u8,
    window: usize,
    stride: usize,
    padding_id: u8,
}

impl Pool2d {
    pub fn kind(&self) -> PoolKind {
        PoolKind::from_id(self.kind_id)
    }

    pub fn padding(&self) -> Padding {
        Padding::from_id(self.padding_id)
    }

    /// Output spatial length for an input of the given length.
    pub fn output_size(&self, input: usize) -> Option<usize> {
        self.padding().output_size(input, self.window, self.stride)
    }

    pub fn forward<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let kernel = [self.window, self.window];
        let stride = [self.stride, self.stride];

        if self.kind() == PoolKind::Max {
            let padded = pad_spatial(input, self.padding(), self.window, self.stride, f32::MIN);
            return max_pool2d(padded, kernel, stride, [0, 0], [1, 1]);
        }

        let [_, _, height, width] = input.dims();
        let (top, bottom) = self.padding().pads(height, self.window, self.stride);
        let (left, right) = self.padding().pads(width, self.window, self.stride);
        if top + bottom + left + right == 0 {
            return avg_pool2d(input, kernel, stride, [0, 0], true);
        }

        // Mean of the real cells: window sums of the zero-padded input over
        // window counts of a zero-padded mask.
        let mask = Tensor::<B, 4>::ones([1, 1, height, width], &input.device());
        let mask = pad_spatial(mask, self.padding(), self.window, self.stride, 0.0);
        let counts = avg_pool2d(mask, kernel, stride, [0, 0], true);

        let padded = pad_spatial(input, self.padding(), self.window, self.stride, 0.0);
        let sums = avg_pool2d(padded, kernel, stride, [0, 0], true);

        sums / counts
    }
}
