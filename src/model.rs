//! The housing-price regressor.
//!
//! A sequential stack of dense layers ending in a single linear unit.
//! [`RegressorConfig::new`] gives the default `64 -> 64 -> 1` topology;
//! the layer builder stays public so other shapes can be tried.

use crate::errors::TrainerError;
use crate::layers::{Activation, Dense, DenseConfig};
use burn::{
    module::Module,
    tensor::{Tensor, TensorData, backend::Backend},
};

/// Width of each hidden layer in the default topology.
pub const HIDDEN_UNITS: usize = 64;

/// Configuration for building a [`Regressor`].
#[derive(Debug, Clone)]
pub struct RegressorConfig {
    /// Number of input features.
    pub num_features: usize,
    /// Layer configurations.
    pub layer_configs: Vec<DenseConfig>,
}

impl RegressorConfig {
    /// Default topology: two ReLU hidden layers and a linear output unit.
    pub fn new(num_features: usize) -> Self {
        Self::empty(num_features)
            .dense(HIDDEN_UNITS, Activation::Relu)
            .dense(HIDDEN_UNITS, Activation::Relu)
            .dense(1, Activation::None)
    }

    /// A configuration with no layers yet.
    pub fn empty(num_features: usize) -> Self {
        Self {
            num_features,
            layer_configs: Vec::new(),
        }
    }

    /// Adds a dense layer to the configuration.
    pub fn dense(mut self, output_size: usize, activation: Activation) -> Self {
        let input_size = self
            .layer_configs
            .last()
            .map(|l| l.output_size)
            .unwrap_or(self.num_features);

        self.layer_configs
            .push(DenseConfig::new(input_size, output_size).with_activation(activation));
        self
    }

    /// Builds the Regressor with the given device.
    pub fn build<B: Backend>(&self, device: &B::Device) -> Result<Regressor<B>, TrainerError> {
        if self.num_features == 0 {
            return Err(TrainerError::NoInputFeatures);
        }

        let Some(last) = self.layer_configs.last() else {
            return Err(TrainerError::NoLayers);
        };

        if let Some(zero) = self.layer_configs.iter().find(|l| l.output_size == 0) {
            return Err(TrainerError::InvalidLayerConfig {
                message: format!("layer {} -> 0 has no units", zero.input_size),
            });
        }

        if last.output_size != 1 {
            return Err(TrainerError::InvalidLayerConfig {
                message: format!(
                    "a regressor must end in a single unit, got {}",
                    last.output_size
                ),
            });
        }

        let layers = self
            .layer_configs
            .iter()
            .map(|config| config.init(device))
            .collect();

        Ok(Regressor { layers })
    }
}

/// Feed-forward regression network.
#[derive(Module, Debug)]
pub struct Regressor<B: Backend> {
    layers: Vec<Dense<B>>,
}

impl<B: Backend> Regressor<B> {
    /// Performs a forward pass: `[batch, num_features] -> [batch, 1]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = input;
        for layer in &self.layers {
            x = layer.forward(x);
        }
        x
    }

    /// Returns the number of input features.
    pub fn num_features(&self) -> usize {
        self.layers.first().map(|l| l.input_size()).unwrap_or(0)
    }

    /// Returns the dense layers in order.
    pub fn layers(&self) -> &[Dense<B>] {
        &self.layers
    }

    /// Predicts one value per row of already normalized features.
    pub fn predict(
        &self,
        rows: &[Vec<f32>],
        device: &B::Device,
    ) -> Result<Vec<f32>, TrainerError> {
        let num_features = self.num_features();
        if let Some(row) = rows.iter().find(|r| r.len() != num_features) {
            return Err(TrainerError::ShapeMismatch {
                expected: num_features,
                actual: row.len(),
            });
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let data = TensorData::new(flat, [rows.len(), num_features]);
        let input = Tensor::<B, 2>::from_data(data, device);

        self.forward(input)
            .to_data()
            .to_vec()
            .map_err(|e| TrainerError::Readback(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_default_topology() {
        let config = RegressorConfig::new(13);

        let sizes: Vec<(usize, usize)> = config
            .layer_configs
            .iter()
            .map(|l| (l.input_size, l.output_size))
            .collect();
        assert_eq!(sizes, vec![(13, 64), (64, 64), (64, 1)]);
        assert_eq!(config.layer_configs[2].activation, Activation::None);
    }

    #[test]
    fn test_regressor_forward_shape() {
        let device = <TestBackend as Backend>::Device::default();
        let model: Regressor<TestBackend> = RegressorConfig::new(13)
            .build(&device)
            .expect("Failed to build model");

        let input = Tensor::<TestBackend, 2>::zeros([5, 13], &device);
        assert_eq!(model.forward(input).dims(), [5, 1]);
        assert_eq!(model.num_features(), 13);
    }

    #[test]
    fn test_predict_checks_width() {
        let device = <TestBackend as Backend>::Device::default();
        let model: Regressor<TestBackend> = RegressorConfig::new(3).build(&device).unwrap();

        let ok = model.predict(&[vec![0.0, 1.0, 2.0], vec![1.0, 1.0, 1.0]], &device);
        assert_eq!(ok.unwrap().len(), 2);

        let bad = model.predict(&[vec![0.0, 1.0]], &device);
        assert!(matches!(
            bad,
            Err(TrainerError::ShapeMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_no_layers_error() {
        let device = <TestBackend as Backend>::Device::default();
        let result: Result<Regressor<TestBackend>, _> = RegressorConfig::empty(4).build(&device);

        assert!(matches!(result, Err(TrainerError::NoLayers)));
    }

    #[test]
    fn test_no_features_error() {
        let device = <TestBackend as Backend>::Device::default();
        let result: Result<Regressor<TestBackend>, _> = RegressorConfig::new(0).build(&device);

        assert!(matches!(result, Err(TrainerError::NoInputFeatures)));
    }

    #[test]
    fn test_multi_output_rejected() {
        let device = <TestBackend as Backend>::Device::default();
        let result: Result<Regressor<TestBackend>, _> = RegressorConfig::empty(4)
            .dense(2, Activation::None)
            .build(&device);

        assert!(matches!(result, Err(TrainerError::InvalidLayerConfig { .. })));
    }
}
