//! Instruction-model JSON format.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::data::Normalizer;
use crate::errors::TrainerError;
use crate::model::Regressor;

/// One step of the exported computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InstructionExport {
    /// `output = activation(weights @ input + bias)`.
    #[serde(rename = "DOT")]
    Dot {
        input: usize,
        output: usize,
        weights: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        activation: Option<String>,
    },
    /// Element-wise add a parameter vector (in-place).
    #[serde(rename = "ADD_ELEMENTWISE")]
    AddElementwise { input: usize, parameters: usize },
    /// Element-wise multiply by a parameter vector (in-place).
    #[serde(rename = "MUL_ELEMENTWISE")]
    MulElementwise { input: usize, parameters: usize },
}

/// The complete exported model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionModelExport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_size: Option<usize>,
    pub buffer_sizes: Vec<usize>,
    pub instructions: Vec<InstructionExport>,
    pub weights: Vec<Vec<Vec<f32>>>,
    pub bias: Vec<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Vec<f32>>,
    /// Global step of the checkpoint this export was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_step: Option<usize>,
}

/// Converts a regressor and its input normalization to the export format.
///
/// Buffer 0 holds the raw features; normalization runs in place on it
/// (`x + (-mean)`, then `x * (1 / std)`), followed by one `DOT` per layer.
pub fn to_instruction_model<B: Backend>(
    model: &Regressor<B>,
    normalizer: &Normalizer,
    feature_names: &[String],
    global_step: Option<usize>,
) -> Result<InstructionModelExport, TrainerError> {
    let num_features = model.num_features();
    if normalizer.num_features() != num_features {
        return Err(TrainerError::ShapeMismatch {
            expected: num_features,
            actual: normalizer.num_features(),
        });
    }

    let mut buffer_sizes = vec![num_features];
    let mut instructions = vec![
        InstructionExport::AddElementwise {
            input: 0,
            parameters: 0,
        },
        InstructionExport::MulElementwise {
            input: 0,
            parameters: 1,
        },
    ];
    let parameters = vec![
        normalizer.mean.iter().map(|m| -m).collect(),
        normalizer.std.iter().map(|s| 1.0 / s).collect(),
    ];
    let mut weights = Vec::with_capacity(model.layers().len());
    let mut bias = Vec::with_capacity(model.layers().len());

    for (i, layer) in model.layers().iter().enumerate() {
        let (layer_weights, layer_bias) = layer.parameters()?;
        buffer_sizes.push(layer.output_size());
        weights.push(layer_weights);
        bias.push(layer_bias);
        instructions.push(InstructionExport::Dot {
            input: i,
            output: i + 1,
            weights: i,
            activation: layer.activation().to_instruction_name().map(String::from),
        });
    }

    let features = (feature_names.len() == num_features).then(|| feature_names.to_vec());

    Ok(InstructionModelExport {
        features,
        feature_size: Some(num_features),
        buffer_sizes,
        instructions,
        weights,
        bias,
        parameters,
        global_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegressorConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_export_structure() {
        let device = <TestBackend as Backend>::Device::default();
        let model: Regressor<TestBackend> = RegressorConfig::new(2).build(&device).unwrap();
        let normalizer = Normalizer {
            mean: vec![1.0, 2.0],
            std: vec![2.0, 4.0],
        };
        let names = vec!["rm".to_string(), "lstat".to_string()];

        let export = to_instruction_model(&model, &normalizer, &names, Some(42)).unwrap();

        assert_eq!(export.buffer_sizes, vec![2, 64, 64, 1]);
        assert_eq!(export.instructions.len(), 5);
        assert_eq!(export.weights.len(), 3);
        assert_eq!(export.parameters, vec![vec![-1.0, -2.0], vec![0.5, 0.25]]);
        assert_eq!(export.features, Some(names));
        assert_eq!(export.global_step, Some(42));
        assert!(matches!(
            export.instructions[4],
            InstructionExport::Dot {
                input: 2,
                output: 3,
                weights: 2,
                activation: None,
            }
        ));
    }

    #[test]
    fn test_export_json_tags() {
        let device = <TestBackend as Backend>::Device::default();
        let model: Regressor<TestBackend> = RegressorConfig::new(1).build(&device).unwrap();
        let normalizer = Normalizer {
            mean: vec![0.0],
            std: vec![1.0],
        };

        let export = to_instruction_model(&model, &normalizer, &[], None).unwrap();
        let json = serde_json::to_string(&export).unwrap();

        assert!(json.contains("\"DOT\""));
        assert!(json.contains("\"RELU\""));
        assert!(json.contains("\"ADD_ELEMENTWISE\""));
        assert!(!json.contains("global_step"));

        let parsed: InstructionModelExport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, export);
    }

    #[test]
    fn test_normalizer_width_checked() {
        let device = <TestBackend as Backend>::Device::default();
        let model: Regressor<TestBackend> = RegressorConfig::new(3).build(&device).unwrap();
        let normalizer = Normalizer {
            mean: vec![0.0],
            std: vec![1.0],
        };

        let err = to_instruction_model(&model, &normalizer, &[], None).unwrap_err();
        assert!(matches!(err, TrainerError::ShapeMismatch { .. }));
    }
}
