//! Fully connected layer with a fused activation.

use crate::errors::TrainerError;
use crate::layers::Activation;
use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{Tensor, backend::Backend},
};

/// Shape and activation of a [`Dense`] layer before its weights exist.
#[derive(Debug, Clone)]
pub struct DenseConfig {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: Activation,
}

impl DenseConfig {
    /// A linear layer; see [`DenseConfig::with_activation`].
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            activation: Activation::None,
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Allocates randomly initialized weights on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Dense<B> {
        Dense {
            linear: LinearConfig::new(self.input_size, self.output_size).init(device),
            input_size: self.input_size,
            output_size: self.output_size,
            activation_id: self.activation.to_id(),
        }
    }
}

/// `activation(x @ W + b)` over `[batch, input_size]` rows.
#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
    linear: Linear<B>,
    input_size: usize,
    output_size: usize,
    /// See [`Activation::to_id`].
    activation_id: u8,
}

/// Weight rows (`[output][input]`) and bias of one layer.
pub type DenseParams = (Vec<Vec<f32>>, Vec<f32>);

impl<B: Backend> Dense<B> {
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.activation().apply(self.linear.forward(input))
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn activation(&self) -> Activation {
        Activation::from_id(self.activation_id)
    }

    /// Copies the parameters to host memory, one weight row per output unit.
    pub fn parameters(&self) -> Result<DenseParams, TrainerError> {
        let read = |data: burn::tensor::TensorData, what: &str| {
            data.to_vec::<f32>()
                .map_err(|e| TrainerError::Readback(format!("dense {}: {:?}", what, e)))
        };

        // Burn keeps W as [input_size, output_size] in row-major order.
        let flat = read(self.linear.weight.val().to_data(), "weights")?;
        let rows = (0..self.output_size)
            .map(|o| {
                (0..self.input_size)
                    .map(|i| flat[i * self.output_size + o])
                    .collect()
            })
            .collect();

        let bias = match &self.linear.bias {
            Some(bias) => read(bias.val().to_data(), "bias")?,
            None => vec![0.0; self.output_size],
        };
        Ok((rows, bias))
    }
}
