//! Activation functions for dense layers.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

/// Activations a regressor layer can use.
///
/// Hidden layers use [`Activation::Relu`]; the output unit stays linear.
/// Each variant has a tensor form for training and a scalar form for the
/// exported serving model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Activation {
    /// Identity.
    #[default]
    None,
    /// max(0, x)
    Relu,
}

impl Activation {
    pub fn apply<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::None => tensor,
            Activation::Relu => burn::tensor::activation::relu(tensor),
        }
    }

    pub fn apply_scalar(&self, x: f32) -> f32 {
        match self {
            Activation::None => x,
            Activation::Relu => x.max(0.0),
        }
    }

    /// Name written to the `activation` field of a `DOT` instruction.
    /// The identity is written as no activation at all.
    pub fn to_instruction_name(&self) -> Option<&'static str> {
        match self {
            Activation::None => None,
            Activation::Relu => Some("RELU"),
        }
    }

    /// Parses an instruction name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "NONE" | "LINEAR" => Some(Activation::None),
            "RELU" => Some(Activation::Relu),
            _ => None,
        }
    }

    /// Compact form stored as a constant field of [`Dense`](super::Dense).
    pub fn to_id(&self) -> u8 {
        match self {
            Activation::None => 0,
            Activation::Relu => 1,
        }
    }

    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Activation::Relu,
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
    fn test_activation_names() {
        assert_eq!(Activation::None.to_instruction_name(), None);
        assert_eq!(Activation::Relu.to_instruction_name(), Some("RELU"));
        assert_eq!(Activation::from_name("relu"), Some(Activation::Relu));
        assert_eq!(Activation::from_name("linear"), Some(Activation::None));
        assert_eq!(Activation::from_name("sigmoid"), None);
    }

    #[test]
    fn test_activation_id_roundtrip() {
        for act in [Activation::None, Activation::Relu] {
            assert_eq!(Activation::from_id(act.to_id()), act);
        }
    }

    #[test]
    fn test_scalar_matches_tensor() {
        let device = <TestBackend as Backend>::Device::default();
        let values = [-2.0f32, -0.5, 0.0, 0.5, 2.0];

        for act in [Activation::None, Activation::Relu] {
            let input = Tensor::<TestBackend, 1>::from_floats(values, &device);
            let output: Vec<f32> = act.apply(input).to_data().to_vec().unwrap();
            for (x, y) in values.iter().zip(output.iter()) {
                assert!(
                    (act.apply_scalar(*x) - y).abs() < 1e-6,
                    "{:?} mismatch at {}",
                    act,
                    x
                );
            }
        }
    }

    #[test]
    fn test_relu_clamps_negatives() {
        assert_eq!(Activation::Relu.apply_scalar(-3.0), 0.0);
        assert_eq!(Activation::Relu.apply_scalar(3.0), 3.0);
    }
}
