//! Command-line arguments of the training job.

use std::path::PathBuf;

use clap::Parser;

use crate::data::{DEFAULT_SPLIT_SEED, DEFAULT_TARGET_COLUMN};
use crate::errors::TrainerError;
use crate::training::HParams;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "boston-trainer",
    about = "Train and export a Boston housing price regressor"
)]
pub struct Args {
    /// Location to write checkpoints and export models.
    #[arg(long)]
    pub job_dir: Option<PathBuf>,
    /// Dataset file (CSV with a header row).
    #[arg(long)]
    pub train_file: PathBuf,
    /// Split between training and test.
    #[arg(long, default_value_t = 0.2)]
    pub test_split: f64,
    /// Number of times to go through the data.
    #[arg(long, default_value_t = 500.0)]
    pub num_epochs: f64,
    /// Number of records to read during each training step.
    #[arg(long, default_value_t = 128)]
    pub batch_size: usize,
    /// Learning rate for gradient descent.
    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,
    /// Seed for shuffling and weight initialization.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Seed of the train/test split.
    #[arg(long, default_value_t = DEFAULT_SPLIT_SEED)]
    pub split_seed: u64,
    /// Name of the label column.
    #[arg(long, default_value = DEFAULT_TARGET_COLUMN)]
    pub target_column: String,
    /// Seconds after start before the first evaluation.
    #[arg(long, default_value_t = 10)]
    pub eval_start_delay_secs: u64,
    /// Minimum seconds between evaluations.
    #[arg(long, default_value_t = 10)]
    pub eval_throttle_secs: u64,
}

impl TryFrom<Args> for HParams {
    type Error = TrainerError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let hparams = HParams {
            job_dir: args.job_dir,
            train_file: args.train_file,
            test_split: args.test_split,
            num_epochs: args.num_epochs,
            batch_size: args.batch_size,
            learning_rate: args.learning_rate,
            seed: args.seed,
            split_seed: args.split_seed,
            target_column: args.target_column,
            eval_throttle_secs: args.eval_throttle_secs,
            eval_start_delay_secs: args.eval_start_delay_secs,
        };
        hparams.validate()?;
        Ok(hparams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["boston-trainer", "--train-file", "housing.csv"]).unwrap();
        let hp = HParams::try_from(args).unwrap();

        assert_eq!(hp.train_file, PathBuf::from("housing.csv"));
        assert!(hp.job_dir.is_none());
        assert!((hp.test_split - 0.2).abs() < 1e-10);
        assert!((hp.num_epochs - 500.0).abs() < 1e-10);
        assert_eq!(hp.batch_size, 128);
        assert!((hp.learning_rate - 0.001).abs() < 1e-10);
        assert_eq!(hp.target_column, "medv");
    }

    #[test]
    fn test_train_file_required() {
        assert!(Args::try_parse_from(["boston-trainer"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "boston-trainer",
            "--train-file",
            "data.csv",
            "--job-dir",
            "/tmp/job",
            "--num-epochs",
            "2.5",
            "--batch-size",
            "16",
            "--learning-rate",
            "0.01",
            "--test-split",
            "0.3",
        ])
        .unwrap();
        let hp = HParams::try_from(args).unwrap();

        assert_eq!(hp.job_dir, Some(PathBuf::from("/tmp/job")));
        assert!((hp.num_epochs - 2.5).abs() < 1e-10);
        assert_eq!(hp.batch_size, 16);
        assert!((hp.test_split - 0.3).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let args = Args::try_parse_from([
            "boston-trainer",
            "--train-file",
            "data.csv",
            "--batch-size",
            "0",
        ])
        .unwrap();
        assert!(HParams::try_from(args).is_err());
    }
}
