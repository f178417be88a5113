//! Dense (fully connected) layer implementation.

use burn::{
    module::{Module, Param},
    nn::{Initializer, Linear, LinearConfig},
    tensor::{Tensor, backend::Backend},
};

/// Configuration for a Dense layer.
#[derive(Debug, Clone)]
pub struct DenseConfig {
    /// Number of input features.
    pub input_size: usize,
    /// Number of output features.
    pub output_size: usize,
}

impl DenseConfig {
    /// Creates a new DenseConfig.
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
        }
    }

    /// Initializes the Dense layer with the given device.
    ///
    /// Weights are Xavier uniform, biases start at zero.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Dense<B> {
        let mut linear = LinearConfig::new(self.input_size, self.output_size)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);
        linear.bias = Some(Param::from_tensor(Tensor::zeros(
            [self.output_size],
            device,
        )));

        Dense {
            linear,
            input_size: self.input_size,
            output_size: self.output_size,
        }
    }
}

/// A dense (fully connected) layer producing raw outputs.
///
/// It performs: output = input @ weights + bias
#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
    /// The underlying linear transformation.
    linear: Linear<B>,
    /// Input size (constant metadata).
    input_size: usize,
    /// Output size (constant metadata).
    output_size: usize,
}

impl<B: Backend> Dense<B> {
    /// Performs the forward pass.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(input)
    }

    /// Returns the input size of this layer.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Returns the output size of this layer.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Extracts the weights in Burn's `[input_size, output_size]` layout,
    /// flattened row by row.
    pub fn weights_to_vec(&self) -> Vec<f32> {
        self.linear
            .weight
            .val()
            .to_data()
            .to_vec()
            .unwrap_or_default()
    }

    /// Extracts the bias as a 1D vector.
    pub fn bias_to_vec(&self) -> Vec<f32> {
        match &self.linear.bias {
            Some(bias) => bias.val().to_data().to_vec().unwrap_or_default(),
            None => vec![0.0; self.output_size],
        }
    }
}
