//! Spatial padding modes shared by convolutions and pooling.
//!
//! "Same" follows the TensorFlow convention: the output spatial size is
//! `ceil(input / stride)` and the total padding is split with the smaller
//! half in front. Burn's own padding is symmetric, so "same" is realised by
//! padding the tensor explicitly and then running the operator unpadded.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

/// Padding mode of a convolution or pooling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// Output size is `ceil(input / stride)`.
    #[default]
    Same,
    /// No padding; output size is `(input - kernel) / stride + 1`.
    Valid,
}

impl Padding {
    /// Output length along one spatial axis, or `None` when the window does
    /// not fit (valid padding on an input shorter than the kernel).
    pub fn output_size(&self, input: usize, kernel: usize, stride: usize) -> Option<usize> {
        if input == 0 || kernel == 0 || stride == 0 {
            return None;
        }
        match self {
            Padding::Same => Some(input.div_ceil(stride)),
            Padding::Valid if input >= kernel => Some((input - kernel) / stride + 1),
            Padding::Valid => None,
        }
    }

    /// Padding `(before, after)` along one spatial axis.
    pub fn pads(&self, input: usize, kernel: usize, stride: usize) -> (usize, usize) {
        match self {
            Padding::Valid => (0, 0),
            Padding::Same => {
                let output = input.div_ceil(stride.max(1));
                let needed = (output.saturating_sub(1) * stride + kernel).saturating_sub(input);
                let before = needed / 2;
                (before, needed - before)
            }
        }
    }

    /// Converts the mode to a numeric ID for storage in a Module.
    pub fn to_id(&self) -> u8 {
        match self {
            Padding::Same => 0,
            Padding::Valid => 1,
        }
    }

    /// Creates a Padding from a numeric ID.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Padding::Valid,
            _ => Padding::Same,
        }
    }
}

/// Pads the two spatial axes of an NCHW tensor so that an unpadded window
/// of `kernel`/`stride` produces the output size of `padding`.
pub(crate) fn pad_spatial<B: Backend>(
    input: Tensor<B, 4>,
    padding: Padding,
    kernel: usize,
    stride: usize,
    value: f32,
) -> Tensor<B, 4> {
    let [_, _, height, width] = input.dims();
    let (top, bottom) = padding.pads(height, kernel, stride);
    let (left, right) = padding.pads(width, kernel, stride);

    if top + bottom + left + right == 0 {
        return input;
    }
    input.pad((left, right, top, bottom), value)
}
