//! The train-and-evaluate loop.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer, RmsPropConfig};
use burn::tensor::ElementConversion;
use burn::tensor::backend::{AutodiffBackend, Backend};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::checkpoint::CheckpointManager;
use super::config::RunConfig;
use super::input::InputFn;
use super::loss::Loss;
use super::spec::{EvalResult, EvalSpec, TrainSpec};
use crate::errors::TrainerError;
use crate::model::{Regressor, RegressorConfig};

/// Parameters handed to the model constructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorParams {
    pub learning_rate: f64,
    pub num_features: usize,
}

/// Builds, trains, checkpoints, evaluates and exports a [`Regressor`].
#[derive(Debug, Clone)]
pub struct Estimator<B: AutodiffBackend> {
    config: RunConfig,
    params: EstimatorParams,
    model_config: RegressorConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Estimator<B> {
    /// Creates an estimator for the default `64 -> 64 -> 1` regressor.
    pub fn new(config: RunConfig, params: EstimatorParams, device: B::Device) -> Self {
        Self {
            model_config: RegressorConfig::new(params.num_features),
            config,
            params,
            device,
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.config.model_dir
    }

    fn optimizer_config(&self) -> RmsPropConfig {
        RmsPropConfig::new().with_alpha(0.9).with_epsilon(1e-7)
    }

    /// Loads the newest checkpointed model, if any.
    pub fn latest_model(&self) -> Result<Option<Regressor<B>>, TrainerError> {
        let checkpoints =
            CheckpointManager::open(self.model_dir(), self.config.keep_checkpoint_max)?;
        let model = self.model_config.build::<B>(&self.device)?;
        let optim = self.optimizer_config().init::<B, Regressor<B>>();
        Ok(checkpoints
            .restore(model, optim, &self.device)?
            .map(|(model, _, _)| model))
    }

    /// Trains until `train_spec.max_steps`, evaluating and exporting along the way.
    ///
    /// Resumes from the newest checkpoint in the model directory. Returns the
    /// metrics of the final evaluation.
    pub fn train_and_evaluate(
        &self,
        train_spec: &TrainSpec,
        eval_spec: &EvalSpec,
    ) -> Result<EvalResult, TrainerError> {
        if train_spec.input.num_features() != self.params.num_features {
            return Err(TrainerError::ShapeMismatch {
                expected: self.params.num_features,
                actual: train_spec.input.num_features(),
            });
        }

        if let Some(seed) = self.config.seed {
            B::seed(seed);
        }
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let mut checkpoints =
            CheckpointManager::open(self.model_dir(), self.config.keep_checkpoint_max)?;
        let mut model = self.model_config.build::<B>(&self.device)?;
        let mut optim = self.optimizer_config().init::<B, Regressor<B>>();
        let mut global_step = 0;
        if let Some((restored, restored_optim, step)) =
            checkpoints.restore(model.clone(), optim.clone(), &self.device)?
        {
            model = restored;
            optim = restored_optim;
            global_step = step;
        }

        let max_steps = train_spec.max_steps;
        if global_step >= max_steps {
            log::info!(
                "Skipping training since max_steps ({}) has already been reached at step {}.",
                max_steps,
                global_step
            );
        } else {
            log::info!(
                "Training from step {} to {} with batch size {}",
                global_step,
                max_steps,
                train_spec.input.batch_size()
            );
        }

        let started = Instant::now();
        let mut last_eval: Option<Instant> = None;
        let mut log_mark = (Instant::now(), global_step);
        let remaining = max_steps.saturating_sub(global_step);
        let log_every = self.config.log_step_count_steps.max(1);
        let save_every = self.config.save_checkpoints_steps.max(1);
        let mut batches = train_spec.input.batches::<B>(&self.device, rng);

        for _ in 0..remaining {
            let Some(batch) = batches.next() else {
                break;
            };

            let predictions = model.forward(batch.features);
            let loss = Loss::Mse.compute(predictions, batch.labels);
            let loss_value: f32 = loss.clone().into_scalar().elem();
            global_step += 1;

            if !loss_value.is_finite() {
                return Err(TrainerError::Diverged {
                    step: global_step,
                    loss: loss_value,
                });
            }

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(self.params.learning_rate, model, grads);

            if global_step % log_every == 0 {
                let elapsed = log_mark.0.elapsed().as_secs_f64();
                let rate = (global_step - log_mark.1) as f64 / elapsed.max(f64::EPSILON);
                log::info!(
                    "loss = {:.6}, step = {} ({:.1} steps/sec)",
                    loss_value,
                    global_step,
                    rate
                );
                log_mark = (Instant::now(), global_step);
            }

            if global_step % save_every == 0 && global_step < max_steps {
                checkpoints.save(global_step, &model, &optim)?;

                let now = Instant::now();
                if eval_due(now, started, last_eval, eval_spec) {
                    self.evaluate_and_export(&model, eval_spec, global_step)?;
                    last_eval = Some(now);
                }
            }
        }

        if checkpoints.latest_step() != Some(global_step) {
            checkpoints.save(global_step, &model, &optim)?;
        }
        self.evaluate_and_export(&model, eval_spec, global_step)
    }

    fn evaluate_and_export(
        &self,
        model: &Regressor<B>,
        eval_spec: &EvalSpec,
        global_step: usize,
    ) -> Result<EvalResult, TrainerError> {
        let valid = model.valid();
        let result = evaluate(
            &valid,
            &eval_spec.input,
            eval_spec.steps,
            &self.device,
            global_step,
        )?;
        log::info!(
            "Saving dict for global step {}: loss = {:.6}, mean_absolute_error = {:.6}, examples = {}",
            result.global_step,
            result.loss,
            result.mae,
            result.num_examples
        );
        self.append_eval_result(&result)?;

        for exporter in &eval_spec.exporters {
            exporter.export(&valid, self.model_dir(), global_step)?;
        }
        Ok(result)
    }

    fn append_eval_result(&self, result: &EvalResult) -> Result<(), TrainerError> {
        let dir = self.model_dir().join("eval");
        fs::create_dir_all(&dir).map_err(|e| TrainerError::io(&dir, e))?;
        let path = dir.join("metrics.jsonl");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TrainerError::io(&path, e))?;
        let line = serde_json::to_string(result)?;
        writeln!(file, "{}", line).map_err(|e| TrainerError::io(&path, e))
    }
}

fn eval_due(now: Instant, started: Instant, last_eval: Option<Instant>, spec: &EvalSpec) -> bool {
    let since = |t: Instant| now.saturating_duration_since(t);
    since(started) >= spec.start_delay
        && last_eval.is_none_or(|t| since(t) >= spec.throttle)
}

/// Computes mean squared and mean absolute error over `input`.
///
/// Batch means are weighted by batch size so a short final batch counts
/// exactly as much as its examples. At most one pass is made over `input`.
pub fn evaluate<B: Backend>(
    model: &Regressor<B>,
    input: &InputFn,
    steps: Option<usize>,
    device: &B::Device,
    global_step: usize,
) -> Result<EvalResult, TrainerError> {
    let mut squared = 0.0f64;
    let mut absolute = 0.0f64;
    let mut count = 0usize;

    let one_pass = input.len().div_ceil(input.batch_size());
    let batches = input
        .batches::<B>(device, StdRng::seed_from_u64(0))
        .take(steps.unwrap_or(usize::MAX).min(one_pass));
    for batch in batches {
        let n = batch.len();
        let predictions = model.forward(batch.features);
        let mse: f32 = Loss::Mse
            .compute(predictions.clone(), batch.labels.clone())
            .into_scalar()
            .elem();
        let mae: f32 = Loss::Mae.compute(predictions, batch.labels).into_scalar().elem();
        squared += mse as f64 * n as f64;
        absolute += mae as f64 * n as f64;
        count += n;
    }

    if count == 0 {
        return Err(TrainerError::EmptyEvaluation);
    }

    Ok(EvalResult {
        global_step,
        loss: (squared / count as f64) as f32,
        mae: (absolute / count as f64) as f32,
        num_examples: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Normalizer};
    use crate::export::LatestExporter;
    use crate::training::Mode;
    use burn::backend::{Autodiff, NdArray};
    use std::time::Duration;

    type TestBackend = Autodiff<NdArray>;

    fn linear_dataset(n: usize) -> Dataset {
        Dataset {
            feature_names: vec!["x".into(), "z".into()],
            features: (0..n)
                .map(|i| {
                    let x = i as f32 / n as f32 - 0.5;
                    vec![x, -x]
                })
                .collect(),
            labels: (0..n).map(|i| 3.0 * (i as f32 / n as f32 - 0.5) + 1.0).collect(),
        }
    }

    fn estimator(dir: &Path, save_every: usize) -> Estimator<TestBackend> {
        let device = <TestBackend as Backend>::Device::default();
        let config = RunConfig::new(dir)
            .save_checkpoints_steps(save_every)
            .log_step_count_steps(5)
            .seed(Some(11));
        let params = EstimatorParams {
            learning_rate: 0.01,
            num_features: 2,
        };
        Estimator::new(config, params, device)
    }

    fn specs(data: &Dataset, max_steps: usize) -> (TrainSpec, EvalSpec) {
        let train = TrainSpec::new(InputFn::new(data, 8, Mode::Train).unwrap(), max_steps);
        let exporter = LatestExporter::new(
            "exporter",
            Normalizer::fit(&data.features),
            data.feature_names.clone(),
        );
        let eval = EvalSpec::new(InputFn::new(data, 8, Mode::Eval).unwrap())
            .start_delay_secs(0)
            .throttle_secs(0)
            .exporter(exporter);
        (train, eval)
    }

    #[test]
    fn test_evaluate_is_batch_size_independent() {
        let device = <NdArray as Backend>::Device::default();
        let data = linear_dataset(10);
        let model: Regressor<NdArray> = RegressorConfig::new(2).build(&device).unwrap();

        let small = InputFn::new(&data, 3, Mode::Eval).unwrap();
        let large = InputFn::new(&data, 100, Mode::Eval).unwrap();
        let a = evaluate(&model, &small, None, &device, 0).unwrap();
        let b = evaluate(&model, &large, None, &device, 0).unwrap();

        assert_eq!(a.num_examples, 10);
        assert!((a.loss - b.loss).abs() < 1e-4);
        assert!((a.mae - b.mae).abs() < 1e-4);
    }

    #[test]
    fn test_evaluate_respects_steps() {
        let device = <NdArray as Backend>::Device::default();
        let data = linear_dataset(10);
        let model: Regressor<NdArray> = RegressorConfig::new(2).build(&device).unwrap();
        let input = InputFn::new(&data, 3, Mode::Eval).unwrap();

        let result = evaluate(&model, &input, Some(2), &device, 0).unwrap();
        assert_eq!(result.num_examples, 6);
    }

    #[test]
    fn test_evaluate_empty_split() {
        let device = <NdArray as Backend>::Device::default();
        let model: Regressor<NdArray> = RegressorConfig::new(2).build(&device).unwrap();
        let input = InputFn::new(&linear_dataset(0), 3, Mode::Eval).unwrap();

        assert!(matches!(
            evaluate(&model, &input, None, &device, 0),
            Err(TrainerError::EmptyEvaluation)
        ));
    }

    #[test]
    fn test_eval_due_respects_delay_and_throttle() {
        let started = Instant::now();
        let spec = EvalSpec::new(InputFn::new(&linear_dataset(4), 2, Mode::Eval).unwrap())
            .start_delay_secs(10)
            .throttle_secs(5);

        assert!(!eval_due(started + Duration::from_secs(3), started, None, &spec));
        assert!(eval_due(started + Duration::from_secs(10), started, None, &spec));

        let last = Some(started + Duration::from_secs(10));
        assert!(!eval_due(started + Duration::from_secs(12), started, last, &spec));
        assert!(eval_due(started + Duration::from_secs(15), started, last, &spec));
    }

    #[test]
    fn test_checkpoint_eval_and_export_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let data = linear_dataset(32);
        let (train, eval) = specs(&data, 12);

        let result = estimator(dir.path(), 5)
            .train_and_evaluate(&train, &eval)
            .unwrap();

        assert_eq!(result.global_step, 12);
        assert_eq!(result.num_examples, 32);

        let state = CheckpointManager::open(dir.path(), 5).unwrap();
        assert_eq!(state.state().steps, vec![5, 10, 12]);

        let metrics = fs::read_to_string(dir.path().join("eval").join("metrics.jsonl")).unwrap();
        let steps: Vec<usize> = metrics
            .lines()
            .map(|l| serde_json::from_str::<EvalResult>(l).unwrap().global_step)
            .collect();
        assert_eq!(steps, vec![5, 10, 12]);

        let exports = eval.exporters[0].list_exports(dir.path()).unwrap();
        assert_eq!(exports.len(), 3);
    }

    #[test]
    fn test_training_reduces_loss() {
        let dir = tempfile::tempdir().unwrap();
        let data = linear_dataset(64);
        let (train, eval) = specs(&data, 1);
        let estimator = estimator(dir.path(), 1000);

        let first = estimator.train_and_evaluate(&train, &eval).unwrap();
        let longer = TrainSpec::new(train.input.clone(), 400);
        let last = estimator.train_and_evaluate(&longer, &eval).unwrap();

        assert_eq!(last.global_step, 400);
        assert!(
            last.loss < first.loss,
            "loss should decrease: first={}, last={}",
            first.loss,
            last.loss
        );
    }

    #[test]
    fn test_resume_at_max_steps_skips_training() {
        let dir = tempfile::tempdir().unwrap();
        let data = linear_dataset(16);
        let (train, eval) = specs(&data, 6);
        let estimator = estimator(dir.path(), 100);

        let first = estimator.train_and_evaluate(&train, &eval).unwrap();
        let second = estimator.train_and_evaluate(&train, &eval).unwrap();

        assert_eq!(second.global_step, 6);
        assert!((first.loss - second.loss).abs() < 1e-5);
        assert!(estimator.latest_model().unwrap().is_some());
    }

    #[test]
    fn test_feature_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let data = linear_dataset(8);
        let (train, eval) = specs(&data, 2);
        let device = <TestBackend as Backend>::Device::default();
        let params = EstimatorParams {
            learning_rate: 0.01,
            num_features: 5,
        };
        let estimator: Estimator<TestBackend> =
            Estimator::new(RunConfig::new(dir.path()), params, device);

        assert!(matches!(
            estimator.train_and_evaluate(&train, &eval),
            Err(TrainerError::ShapeMismatch { .. })
        ));
    }
}
