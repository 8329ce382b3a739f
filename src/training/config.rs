//! Hyperparameters and run configuration.

use std::path::PathBuf;

use crate::data::{DEFAULT_SPLIT_SEED, DEFAULT_TARGET_COLUMN};
use crate::errors::TrainerError;

/// Hyperparameters of one training job.
#[derive(Debug, Clone)]
pub struct HParams {
    /// Directory for checkpoints and exports. A temporary directory is used when unset.
    pub job_dir: Option<PathBuf>,
    /// CSV dataset.
    pub train_file: PathBuf,
    /// Fraction of rows held out for evaluation.
    pub test_split: f64,
    /// Number of passes over the training data. May be fractional.
    pub num_epochs: f64,
    /// Records per training step.
    pub batch_size: usize,
    /// Learning rate for the optimizer.
    pub learning_rate: f64,
    /// Seed for shuffling and weight initialization. Random when unset.
    pub seed: Option<u64>,
    /// Seed of the train/test split.
    pub split_seed: u64,
    /// Name of the label column.
    pub target_column: String,
    /// Minimum seconds between two evaluations.
    pub eval_throttle_secs: u64,
    /// Seconds after start before the first evaluation.
    pub eval_start_delay_secs: u64,
}

impl HParams {
    /// Creates hyperparameters with defaults for everything but the dataset.
    pub fn new(train_file: impl Into<PathBuf>) -> Self {
        Self {
            job_dir: None,
            train_file: train_file.into(),
            test_split: 0.2,
            num_epochs: 500.0,
            batch_size: 128,
            learning_rate: 0.001,
            seed: None,
            split_seed: DEFAULT_SPLIT_SEED,
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            eval_throttle_secs: 10,
            eval_start_delay_secs: 10,
        }
    }

    pub fn job_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.job_dir = Some(dir.into());
        self
    }

    pub fn test_split(mut self, split: f64) -> Self {
        self.test_split = split;
        self
    }

    pub fn num_epochs(mut self, epochs: f64) -> Self {
        self.num_epochs = epochs;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    /// Sets both evaluation delays; zero evaluates at every checkpoint.
    pub fn eval_throttle(mut self, start_delay_secs: u64, throttle_secs: u64) -> Self {
        self.eval_start_delay_secs = start_delay_secs;
        self.eval_throttle_secs = throttle_secs;
        self
    }

    /// Checks ranges that the argument parser cannot express.
    pub fn validate(&self) -> Result<(), TrainerError> {
        if !(0.0..1.0).contains(&self.test_split) {
            return Err(TrainerError::hyperparameter(
                "test_split",
                format!("must be in [0, 1), got {}", self.test_split),
            ));
        }
        if !(self.num_epochs.is_finite() && self.num_epochs > 0.0) {
            return Err(TrainerError::hyperparameter(
                "num_epochs",
                format!("must be positive, got {}", self.num_epochs),
            ));
        }
        if self.batch_size == 0 {
            return Err(TrainerError::hyperparameter("batch_size", "must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainerError::hyperparameter(
                "learning_rate",
                format!("must be positive, got {}", self.learning_rate),
            ));
        }
        Ok(())
    }
}

/// How the estimator checkpoints and reports progress.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding checkpoints, evaluation output and exports.
    pub model_dir: PathBuf,
    /// Save a checkpoint every N global steps.
    pub save_checkpoints_steps: usize,
    /// Number of most recent checkpoints kept on disk.
    pub keep_checkpoint_max: usize,
    /// Log loss and throughput every N global steps.
    pub log_step_count_steps: usize,
    /// Seed for weight initialization and input shuffling.
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            save_checkpoints_steps: 500,
            keep_checkpoint_max: 5,
            log_step_count_steps: 100,
            seed: None,
        }
    }

    pub fn save_checkpoints_steps(mut self, steps: usize) -> Self {
        self.save_checkpoints_steps = steps.max(1);
        self
    }

    pub fn keep_checkpoint_max(mut self, keep: usize) -> Self {
        self.keep_checkpoint_max = keep.max(1);
        self
    }

    pub fn log_step_count_steps(mut self, steps: usize) -> Self {
        self.log_step_count_steps = steps.max(1);
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}
