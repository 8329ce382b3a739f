//! The training job: data preparation wired to the estimator.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use burn::tensor::backend::AutodiffBackend;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::data::{load_data, normalize_data};
use crate::errors::TrainerError;
use crate::export::LatestExporter;
use crate::training::{
    EvalResult, EvalSpec, Estimator, EstimatorParams, HParams, InputFn, Mode, RunConfig,
    TrainSpec, train_steps,
};

/// Name of the exporter directory under `<job_dir>/export/`.
pub const EXPORTER_NAME: &str = "exporter";

/// Loads, shuffles and normalizes the data, then trains and evaluates.
///
/// Returns the metrics of the final evaluation.
pub fn train_and_evaluate<B: AutodiffBackend>(
    hparams: &HParams,
    device: &B::Device,
) -> Result<EvalResult, TrainerError> {
    hparams.validate()?;

    let (mut train, mut test) = load_data(
        &hparams.train_file,
        hparams.test_split,
        hparams.split_seed,
        &hparams.target_column,
    )?;

    let mut rng = match hparams.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    train.shuffle(&mut rng);

    let normalizer = normalize_data(&mut train, &mut test);
    if test.is_empty() {
        log::warn!("Test split is empty; evaluating on the training split");
        test = train.clone();
    }

    let model_dir = hparams.job_dir.clone().unwrap_or_else(default_model_dir);
    let run_config = RunConfig::new(&model_dir).seed(hparams.seed);

    let max_steps = train_steps(hparams.num_epochs, train.len(), hparams.batch_size);
    let train_spec = TrainSpec::new(
        InputFn::new(&train, hparams.batch_size, Mode::Train)?,
        max_steps,
    );

    let exporter = LatestExporter::new(EXPORTER_NAME, normalizer, train.feature_names.clone());
    let eval_spec = EvalSpec::new(InputFn::new(&test, hparams.batch_size, Mode::Eval)?)
        .steps(None)
        .start_delay_secs(hparams.eval_start_delay_secs)
        .throttle_secs(hparams.eval_throttle_secs)
        .exporter(exporter);

    let estimator = Estimator::<B>::new(
        run_config,
        EstimatorParams {
            learning_rate: hparams.learning_rate,
            num_features: train.num_features(),
        },
        device.clone(),
    );

    log::info!(
        "Using model directory {} ({} train steps)",
        model_dir.display(),
        max_steps
    );
    estimator.train_and_evaluate(&train_spec, &eval_spec)
}

fn default_model_dir() -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("boston-trainer-{}", stamp));
    log::warn!("No job dir given; using temporary directory {}", dir.display());
    dir
}
