//! Regression loss and metric functions.

use burn::tensor::{Tensor, backend::Backend};

/// Supported regression losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// Mean squared error, the training objective.
    Mse,
    /// Mean absolute error, reported during evaluation.
    Mae,
}

impl Loss {
    /// Computes the loss between predictions and targets.
    pub fn compute<B: Backend>(
        &self,
        predictions: Tensor<B, 2>,
        targets: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let diff = predictions - targets;
        match self {
            Loss::Mse => (diff.clone() * diff).mean(),
            Loss::Mae => diff.abs().mean(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_mse_loss_zero() {
        let device = <TestBackend as Backend>::Device::default();
        let predictions = Tensor::<TestBackend, 2>::from_floats([[1.0], [3.0]], &device);
        let targets = predictions.clone();

        let loss_value: f32 = Loss::Mse.compute(predictions, targets).into_scalar();

        assert!(loss_value.abs() < 1e-6, "MSE of identical tensors should be 0");
    }

    #[test]
    fn test_mse_loss_nonzero() {
        let device = <TestBackend as Backend>::Device::default();
        let predictions = Tensor::<TestBackend, 2>::from_floats([[1.0], [2.0]], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats([[2.0], [2.0]], &device);

        let loss_value: f32 = Loss::Mse.compute(predictions, targets).into_scalar();

        // mean((1-2)^2 + (2-2)^2) = 0.5
        assert!((loss_value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_mae_loss() {
        let device = <TestBackend as Backend>::Device::default();
        let predictions = Tensor::<TestBackend, 2>::from_floats([[1.0], [5.0]], &device);
        let targets = Tensor::<TestBackend, 2>::from_floats([[3.0], [4.0]], &device);

        let loss_value: f32 = Loss::Mae.compute(predictions, targets).into_scalar();

        // mean(|1-3| + |5-4|) = 1.5
        assert!((loss_value - 1.5).abs() < 1e-6);
    }
}
