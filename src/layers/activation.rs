//! Activation functions for the convolutional blocks.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

/// Supported activation functions.
///
/// `None` disables the nonlinearity of a block, which is how a block
/// primitive is built "without activation".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// No activation (identity function).
    None,
    /// Rectified Linear Unit: f(x) = max(0, x)
    #[default]
    Relu,
    /// Sigmoid: f(x) = 1 / (1 + exp(-x))
    Sigmoid,
    /// Hyperbolic tangent: f(x) = tanh(x)
    Tanh,
    /// Gaussian Error Linear Unit: f(x) = x * 0.5 * (1 + erf(x / sqrt(2)))
    Gelu,
}

impl Activation {
    /// Applies the activation function to a tensor of any rank.
    pub fn apply<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::None => tensor,
            Activation::Relu => burn::tensor::activation::relu(tensor),
            Activation::Sigmoid => burn::tensor::activation::sigmoid(tensor),
            Activation::Tanh => burn::tensor::activation::tanh(tensor),
            Activation::Gelu => burn::tensor::activation::gelu(tensor),
        }
    }

    /// Converts activation to a numeric ID for storage in a Module.
    pub fn to_id(&self) -> u8 {
        match self {
            Activation::None => 0,
            Activation::Relu => 1,
            Activation::Sigmoid => 2,
            Activation::Tanh => 3,
            Activation::Gelu => 4,
        }
    }

    /// Creates an Activation from a numeric ID.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Activation::Relu,
            2 => Activation::Sigmoid,
            3 => Activation::Tanh,
            4 => Activation::Gelu,
            _ => Activation::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::backend::Backend;

    type TestBackend = NdArray;

    #[test]
    fn test_default_is_relu() {
        assert_eq!(Activation::default(), Activation::Relu);
    }

    #[test]
    fn test_activation_id_roundtrip() {
        let activations = [
            Activation::None,
            Activation::Relu,
            Activation::Sigmoid,
            Activation::Tanh,
            Activation::Gelu,
        ];
        for act in activations {
            assert_eq!(Activation::from_id(act.to_id()), act);
        }
    }

    #[test]
    fn test_relu_on_4d_tensor() {
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 1>::from_floats([-2.0, -0.5, 0.0, 1.5], &device)
            .reshape([1, 1, 2, 2]);
        let output = Activation::Relu.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        assert_eq!(result, vec![0.0, 0.0, 0.0, 1.5]);
    }

    #[test]
    fn test_none_is_identity() {
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 1>::from_floats([-3.0, 0.25, 7.0], &device);
        let output = Activation::None.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();
        assert_eq!(result, vec![-3.0, 0.25, 7.0]);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Activation::Relu).unwrap();
        assert_eq!(json, "\"relu\"");
        let parsed: Activation = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, Activation::None);
        let parsed: Activation = serde_json::from_str("\"tanh\"").unwrap();
        assert_eq!(parsed, Activation::Tanh);
        assert!(serde_json::from_str::<Activation>("\"swish\"").is_err());
    }
}
