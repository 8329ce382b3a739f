//! Z-score feature normalization.

use serde::{Deserialize, Serialize};

use super::Dataset;

/// Per-feature mean and standard deviation fitted on the training split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Normalizer {
    /// Fits the population mean and standard deviation of each column.
    ///
    /// Constant columns get a standard deviation of 1 so they normalize to 0.
    pub fn fit(rows: &[Vec<f32>]) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0f64; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += *x as f64;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0f64; width];
        for row in rows {
            for ((v, m), x) in var.iter_mut().zip(&mean).zip(row) {
                let d = *x as f64 - m;
                *v += d * d;
            }
        }

        let std = var
            .iter()
            .map(|v| {
                let s = (v / n).sqrt();
                if s > f64::EPSILON { s as f32 } else { 1.0 }
            })
            .collect();

        Self {
            mean: mean.into_iter().map(|m| m as f32).collect(),
            std,
        }
    }

    pub fn num_features(&self) -> usize {
        self.mean.len()
    }

    /// Normalizes one row.
    pub fn apply_row(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    /// Normalizes every row of a dataset in place.
    pub fn apply(&self, dataset: &mut Dataset) {
        for row in dataset.features.iter_mut() {
            *row = self.apply_row(row);
        }
    }
}

/// Fits a [`Normalizer`] on `train` and applies it to both splits.
pub fn normalize_data(train: &mut Dataset, test: &mut Dataset) -> Normalizer {
    let normalizer = Normalizer::fit(&train.features);
    normalizer.apply(train);
    normalizer.apply(test);
    normalizer
}
