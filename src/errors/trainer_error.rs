//! Errors raised while loading data, training, checkpointing and exporting.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a training job.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("Model has no layers defined")]
    NoLayers,

    #[error("Model has no input features defined")]
    NoInputFeatures,

    #[error("Invalid layer configuration: {message}")]
    InvalidLayerConfig { message: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Tensor readback failed: {0}")]
    Readback(String),

    #[error("Invalid hyperparameter {name}: {message}")]
    InvalidHyperparameter { name: &'static str, message: String },

    #[error("Dataset error in {path}: {message}")]
    Dataset { path: PathBuf, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model diverged with loss = {loss} at step {step}")]
    Diverged { step: usize, loss: f32 },

    #[error("Evaluation split is empty")]
    EmptyEvaluation,

    #[error("Checkpoint error: {message}")]
    Checkpoint { message: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrainerError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn dataset(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        TrainerError::Dataset {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn hyperparameter(name: &'static str, message: impl Into<String>) -> Self {
        TrainerError::InvalidHyperparameter {
            name,
            message: message.into(),
        }
    }
}
