//! Backend-free evaluation of an exported model.

use std::fs;
use std::path::Path;

use crate::errors::TrainerError;
use crate::layers::Activation;

use super::format::{InstructionExport, InstructionModelExport};

/// A validated instruction model ready for prediction.
#[derive(Debug, Clone)]
pub struct ServingModel {
    info: InstructionModelExport,
    activations: Vec<Activation>,
}

impl ServingModel {
    /// Validates buffer, weight and parameter references.
    pub fn new(info: InstructionModelExport) -> Result<Self, TrainerError> {
        let invalid = |message: String| TrainerError::Export { message };

        if info.buffer_sizes.is_empty() {
            return Err(invalid("model has no buffers".into()));
        }
        if info.weights.len() != info.bias.len() {
            return Err(invalid(format!(
                "{} weight matrices but {} bias vectors",
                info.weights.len(),
                info.bias.len()
            )));
        }

        let buffer = |idx: usize| {
            info.buffer_sizes
                .get(idx)
                .copied()
                .ok_or_else(|| invalid(format!("unknown buffer {}", idx)))
        };

        let mut activations = Vec::with_capacity(info.instructions.len());
        for instruction in &info.instructions {
            match instruction {
                InstructionExport::Dot {
                    input,
                    output,
                    weights,
                    activation,
                } => {
                    let (in_size, out_size) = (buffer(*input)?, buffer(*output)?);
                    let matrix = info
                        .weights
                        .get(*weights)
                        .ok_or_else(|| invalid(format!("unknown weights {}", weights)))?;
                    if matrix.len() != out_size
                        || matrix.iter().any(|row| row.len() != in_size)
                        || info.bias[*weights].len() != out_size
                    {
                        return Err(invalid(format!(
                            "weights {} do not map {} -> {}",
                            weights, in_size, out_size
                        )));
                    }
                    let act = match activation {
                        None => Activation::None,
                        Some(name) => Activation::from_name(name)
                            .ok_or_else(|| invalid(format!("unknown activation {}", name)))?,
                    };
                    activations.push(act);
                }
                InstructionExport::AddElementwise { input, parameters }
                | InstructionExport::MulElementwise { input, parameters } => {
                    let size = buffer(*input)?;
                    let params = info
                        .parameters
                        .get(*parameters)
                        .ok_or_else(|| invalid(format!("unknown parameters {}", parameters)))?;
                    if params.len() != size {
                        return Err(invalid(format!(
                            "parameters {} have {} values for a buffer of {}",
                            parameters,
                            params.len(),
                            size
                        )));
                    }
                    activations.push(Activation::None);
                }
            }
        }

        Ok(Self { info, activations })
    }

    /// Reads and validates an exported `model.json`.
    pub fn load(path: &Path) -> Result<Self, TrainerError> {
        let text = fs::read_to_string(path).map_err(|e| TrainerError::io(path, e))?;
        Self::new(serde_json::from_str(&text)?)
    }

    pub fn info(&self) -> &InstructionModelExport {
        &self.info
    }

    pub fn feature_size(&self) -> usize {
        self.info.buffer_sizes[0]
    }

    /// Runs every instruction on one raw feature row and returns the last buffer.
    pub fn predict(&self, features: &[f32]) -> Result<Vec<f32>, TrainerError> {
        if features.len() != self.feature_size() {
            return Err(TrainerError::ShapeMismatch {
                expected: self.feature_size(),
                actual: features.len(),
            });
        }

        let mut buffers: Vec<Vec<f32>> = self
            .info
            .buffer_sizes
            .iter()
            .map(|size| vec![0.0; *size])
            .collect();
        buffers[0].copy_from_slice(features);

        for (instruction, activation) in self.info.instructions.iter().zip(&self.activations) {
            match instruction {
                InstructionExport::Dot {
                    input,
                    output,
                    weights,
                    ..
                } => {
                    let matrix = &self.info.weights[*weights];
                    let bias = &self.info.bias[*weights];
                    let result: Vec<f32> = matrix
                        .iter()
                        .zip(bias)
                        .map(|(row, b)| {
                            let z = row
                                .iter()
                                .zip(&buffers[*input])
                                .map(|(w, x)| w * x)
                                .sum::<f32>()
                                + b;
                            activation.apply_scalar(z)
                        })
                        .collect();
                    buffers[*output] = result;
                }
                InstructionExport::AddElementwise { input, parameters } => {
                    for (x, p) in buffers[*input].iter_mut().zip(&self.info.parameters[*parameters]) {
                        *x += p;
                    }
                }
                InstructionExport::MulElementwise { input, parameters } => {
                    for (x, p) in buffers[*input].iter_mut().zip(&self.info.parameters[*parameters]) {
                        *x *= p;
                    }
                }
            }
        }

        Ok(buffers.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> InstructionModelExport {
        InstructionModelExport {
            features: None,
            feature_size: Some(2),
            buffer_sizes: vec![2, 1],
            instructions: vec![
                InstructionExport::AddElementwise {
                    input: 0,
                    parameters: 0,
                },
                InstructionExport::MulElementwise {
                    input: 0,
                    parameters: 1,
                },
                InstructionExport::Dot {
                    input: 0,
                    output: 1,
                    weights: 0,
                    activation: None,
                },
            ],
            weights: vec![vec![vec![1.0, 2.0]]],
            bias: vec![vec![0.5]],
            parameters: vec![vec![-1.0, -1.0], vec![0.5, 2.0]],
            global_step: None,
        }
    }

    #[test]
    fn test_predict_applies_normalization_then_dot() {
        let model = ServingModel::new(tiny()).unwrap();
        // ((3-1)*0.5)*1 + ((2-1)*2)*2 + 0.5 = 1 + 4 + 0.5
        let out = model.predict(&[3.0, 2.0]).unwrap();
        assert_eq!(out, vec![5.5]);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let model = ServingModel::new(tiny()).unwrap();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(TrainerError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_invalid_references_rejected() {
        let mut info = tiny();
        info.weights[0][0].push(3.0);
        assert!(ServingModel::new(info).is_err());

        let mut info = tiny();
        info.parameters.pop();
        assert!(ServingModel::new(info).is_err());

        let mut info = tiny();
        info.instructions.push(InstructionExport::Dot {
            input: 0,
            output: 5,
            weights: 0,
            activation: None,
        });
        assert!(ServingModel::new(info).is_err());
    }
}
