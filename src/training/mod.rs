//! Training machinery: hyperparameters, input functions, checkpoints and
//! the train-and-evaluate loop.

mod checkpoint;
mod config;
mod estimator;
mod input;
mod loss;
mod spec;

pub use checkpoint::{CheckpointManager, CheckpointState};
pub use config::{HParams, RunConfig};
pub use estimator::{Estimator, EstimatorParams, evaluate};
pub use input::{Batch, Batches, InputFn, Mode};
pub use loss::Loss;
pub use spec::{EvalResult, EvalSpec, TrainSpec, train_steps};
