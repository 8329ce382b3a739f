//! Checkpoint persistence: model and optimizer records per global step.
//!
//! Layout inside the model directory:
//!
//! ```text
//! checkpoint.json      retained steps, newest last
//! model-<step>.bin     model record
//! optim-<step>.bin     optimizer record
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::optim::Optimizer;
use burn::record::{BinFileRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::errors::TrainerError;
use crate::model::Regressor;

const STATE_FILE: &str = "checkpoint.json";

/// Index of the checkpoints present in a model directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Retained global steps in ascending order.
    pub steps: Vec<usize>,
}

impl CheckpointState {
    pub fn latest(&self) -> Option<usize> {
        self.steps.last().copied()
    }
}

/// Saves, prunes and restores checkpoints in one directory.
#[derive(Debug)]
pub struct CheckpointManager {
    dir: PathBuf,
    keep_max: usize,
    state: CheckpointState,
}

impl CheckpointManager {
    /// Opens `dir`, reading an existing `checkpoint.json` if there is one.
    pub fn open(dir: &Path, keep_max: usize) -> Result<Self, TrainerError> {
        fs::create_dir_all(dir).map_err(|e| TrainerError::io(dir, e))?;

        let state_path = dir.join(STATE_FILE);
        let state = if state_path.exists() {
            let text = fs::read_to_string(&state_path).map_err(|e| TrainerError::io(&state_path, e))?;
            let mut state: CheckpointState =
                serde_json::from_str(&text).map_err(|e| TrainerError::Checkpoint {
                    message: format!("corrupt {}: {}", state_path.display(), e),
                })?;
            state.steps.sort_unstable();
            state.steps.dedup();
            state
        } else {
            CheckpointState::default()
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            keep_max: keep_max.max(1),
            state,
        })
    }

    pub fn state(&self) -> &CheckpointState {
        &self.state
    }

    pub fn latest_step(&self) -> Option<usize> {
        self.state.latest()
    }

    fn model_path(&self, step: usize) -> PathBuf {
        self.dir.join(format!("model-{}", step))
    }

    fn optim_path(&self, step: usize) -> PathBuf {
        self.dir.join(format!("optim-{}", step))
    }

    /// Writes the model and optimizer records for `step` and prunes old ones.
    pub fn save<B, O>(
        &mut self,
        step: usize,
        model: &Regressor<B>,
        optim: &O,
    ) -> Result<(), TrainerError>
    where
        B: AutodiffBackend,
        O: Optimizer<Regressor<B>, B>,
    {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();

        model
            .clone()
            .save_file(self.model_path(step), &recorder)
            .map_err(|e| TrainerError::Checkpoint {
                message: format!("failed to save model at step {}: {:?}", step, e),
            })?;
        Recorder::<B>::record(&recorder, optim.to_record(), self.optim_path(step)).map_err(
            |e| TrainerError::Checkpoint {
                message: format!("failed to save optimizer at step {}: {:?}", step, e),
            },
        )?;

        if self.state.latest() != Some(step) {
            self.state.steps.retain(|s| *s != step);
            self.state.steps.push(step);
            self.state.steps.sort_unstable();
        }

        while self.state.steps.len() > self.keep_max {
            let old = self.state.steps.remove(0);
            for path in [self.model_path(old), self.optim_path(old)] {
                let file = path.with_extension("bin");
                if let Err(e) = fs::remove_file(&file) {
                    log::warn!("Could not remove old checkpoint {}: {}", file.display(), e);
                }
            }
        }

        self.write_state()?;
        log::info!(
            "Saving checkpoints for {} into {}.",
            step,
            self.model_path(step).with_extension("bin").display()
        );
        Ok(())
    }

    fn write_state(&self) -> Result<(), TrainerError> {
        let path = self.dir.join(STATE_FILE);
        let text = serde_json::to_string_pretty(&self.state)?;
        fs::write(&path, text).map_err(|e| TrainerError::io(&path, e))
    }

    /// Loads the newest checkpoint into `model` and `optim`.
    ///
    /// Returns `None` when the directory has no checkpoint yet.
    pub fn restore<B, O>(
        &self,
        model: Regressor<B>,
        optim: O,
        device: &B::Device,
    ) -> Result<Option<(Regressor<B>, O, usize)>, TrainerError>
    where
        B: AutodiffBackend,
        O: Optimizer<Regressor<B>, B>,
    {
        let Some(step) = self.state.latest() else {
            return Ok(None);
        };

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let model = model
            .load_file(self.model_path(step), &recorder, device)
            .map_err(|e| TrainerError::Checkpoint {
                message: format!("failed to restore model at step {}: {:?}", step, e),
            })?;
        let record: O::Record = Recorder::<B>::load(&recorder, self.optim_path(step), device)
            .map_err(|e| TrainerError::Checkpoint {
                message: format!("failed to restore optimizer at step {}: {:?}", step, e),
            })?;
        let optim = optim.load_record(record);

        log::info!(
            "Restoring parameters from {}",
            self.model_path(step).with_extension("bin").display()
        );
        Ok(Some((model, optim, step)))
    }
}
