//! Exporter that keeps the most recent serving models.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use burn::tensor::backend::Backend;

use crate::data::Normalizer;
use crate::errors::TrainerError;
use crate::model::Regressor;

use super::format::to_instruction_model;

/// Number of exports retained by default.
pub const DEFAULT_EXPORTS_TO_KEEP: usize = 5;

const MODEL_FILE: &str = "model.json";

/// Writes `<model_dir>/export/<name>/<unix-seconds>/model.json` after each
/// evaluation and deletes the oldest exports beyond `exports_to_keep`.
#[derive(Debug, Clone)]
pub struct LatestExporter {
    name: String,
    exports_to_keep: usize,
    normalizer: Normalizer,
    feature_names: Vec<String>,
}

impl LatestExporter {
    /// `normalizer` is baked into every export so it accepts raw features.
    pub fn new(name: impl Into<String>, normalizer: Normalizer, feature_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            exports_to_keep: DEFAULT_EXPORTS_TO_KEEP,
            normalizer,
            feature_names,
        }
    }

    pub fn exports_to_keep(mut self, keep: usize) -> Self {
        self.exports_to_keep = keep.max(1);
        self
    }

    /// Directory holding this exporter's timestamped exports.
    pub fn base_dir(&self, model_dir: &Path) -> PathBuf {
        model_dir.join("export").join(&self.name)
    }

    /// Exports `model` and returns the path of the written `model.json`.
    pub fn export<B: Backend>(
        &self,
        model: &Regressor<B>,
        model_dir: &Path,
        global_step: usize,
    ) -> Result<PathBuf, TrainerError> {
        let base = self.base_dir(model_dir);
        fs::create_dir_all(&base).map_err(|e| TrainerError::io(&base, e))?;

        let info = to_instruction_model(
            model,
            &self.normalizer,
            &self.feature_names,
            Some(global_step),
        )?;
        let json = serde_json::to_string_pretty(&info)?;

        // Stamps must stay increasing even when several exports land in one second.
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let next_free = list_stamped(&base)?
            .last()
            .and_then(|p| p.file_name()?.to_str()?.parse::<u64>().ok())
            .map_or(0, |newest| newest + 1);
        let stamp = now.max(next_free);

        // Write under a temporary name so readers never see a partial export.
        let temp = base.join(format!("temp-{}", stamp));
        fs::create_dir_all(&temp).map_err(|e| TrainerError::io(&temp, e))?;
        let temp_file = temp.join(MODEL_FILE);
        fs::write(&temp_file, json).map_err(|e| TrainerError::io(&temp_file, e))?;

        let dest = base.join(stamp.to_string());
        fs::rename(&temp, &dest).map_err(|e| TrainerError::io(&dest, e))?;
        log::info!("Exported serving model for step {} to {}", global_step, dest.display());

        self.garbage_collect(&base)?;
        Ok(dest.join(MODEL_FILE))
    }

    /// Lists retained exports, oldest first.
    pub fn list_exports(&self, model_dir: &Path) -> Result<Vec<PathBuf>, TrainerError> {
        list_stamped(&self.base_dir(model_dir))
    }

    fn garbage_collect(&self, base: &Path) -> Result<(), TrainerError> {
        let exports = list_stamped(base)?;
        let excess = exports.len().saturating_sub(self.exports_to_keep);
        for old in &exports[..excess] {
            if let Err(e) = fs::remove_dir_all(old) {
                log::warn!("Could not remove old export {}: {}", old.display(), e);
            }
        }
        Ok(())
    }
}

fn list_stamped(base: &Path) -> Result<Vec<PathBuf>, TrainerError> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(base).map_err(|e| TrainerError::io(base, e))?;
    let mut stamped: Vec<(u64, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let stamp = entry.file_name().to_str()?.parse::<u64>().ok()?;
            Some((stamp, entry.path()))
        })
        .collect();
    stamped.sort_by_key(|(stamp, _)| *stamp);
    Ok(stamped.into_iter().map(|(_, path)| path).collect())
}
