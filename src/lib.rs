//! # boston-trainer
//!
//! Trains a small feed-forward network that predicts Boston housing prices
//! from tabular features, using the Burn framework.
//!
//! The job loads a CSV file, holds out a test split, normalizes features
//! with training-set statistics, and trains a `64 -> 64 -> 1` ReLU
//! regressor with RMSProp on mean squared error. Checkpoints are written
//! every 500 steps; after each evaluation the model is exported as a
//! self-contained JSON instruction model that accepts raw features.
//!
//! ## Example
//!
//! ```
//! use boston::prelude::*;
//! use burn::backend::NdArray;
//!
//! let device = <NdArray as burn::tensor::backend::Backend>::Device::default();
//! let model: Regressor<NdArray> = RegressorConfig::new(13)
//!     .build(&device)
//!     .expect("Failed to build model");
//!
//! let normalizer = Normalizer { mean: vec![0.0; 13], std: vec![1.0; 13] };
//! let export = boston::export::to_instruction_model(&model, &normalizer, &[], None).unwrap();
//! let serving = ServingModel::new(export).unwrap();
//! assert_eq!(serving.predict(&[0.0; 13]).unwrap().len(), 1);
//! ```

pub mod cli;
pub mod data;
pub mod errors;
pub mod export;
pub mod layers;
pub mod logging;
pub mod model;
pub mod task;
pub mod training;

pub use errors::TrainerError;
pub use layers::activation::Activation;
pub use model::{Regressor, RegressorConfig};
pub use training::{HParams, Loss, RunConfig};

/// Backend used for training.
#[cfg(not(feature = "wgpu"))]
pub type Backend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Backend used for training.
#[cfg(feature = "wgpu")]
pub type Backend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::Backend;
    pub use crate::data::{Dataset, Normalizer, load_data, normalize_data};
    pub use crate::errors::TrainerError;
    pub use crate::export::{LatestExporter, ServingModel};
    pub use crate::layers::activation::Activation;
    pub use crate::model::{Regressor, RegressorConfig};
    pub use crate::task::train_and_evaluate;
    pub use crate::training::{
        EvalResult, EvalSpec, Estimator, EstimatorParams, HParams, InputFn, Loss, Mode,
        RunConfig, TrainSpec,
    };
}
