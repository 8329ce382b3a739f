//! CSV dataset loading and the train/test split.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::errors::TrainerError;

/// Seed of the fixed train/test split permutation.
pub const DEFAULT_SPLIT_SEED: u64 = 113;

/// Name of the label column in the Boston housing CSV.
pub const DEFAULT_TARGET_COLUMN: &str = "medv";

/// Feature rows and their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<f32>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Applies one random permutation to rows and labels together.
    pub fn shuffle<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.reorder(&order);
    }

    fn reorder(&mut self, order: &[usize]) {
        self.features = order.iter().map(|&i| self.features[i].clone()).collect();
        self.labels = order.iter().map(|&i| self.labels[i]).collect();
    }

    /// Splits off the first `n` rows, keeping the remainder in a second set.
    fn split_at(self, n: usize) -> (Dataset, Dataset) {
        let Dataset {
            feature_names,
            mut features,
            mut labels,
        } = self;
        let test_features = features.split_off(n);
        let test_labels = labels.split_off(n);
        (
            Dataset {
                feature_names: feature_names.clone(),
                features,
                labels,
            },
            Dataset {
                feature_names,
                features: test_features,
                labels: test_labels,
            },
        )
    }
}

/// Loads a CSV file and splits it into `(train, test)`.
///
/// The target column is matched case-insensitively against `target_column`;
/// when no header matches, the last column is the target. Rows are permuted
/// with an RNG seeded by `split_seed` before the split, so the same file and
/// seed always produce the same partition.
pub fn load_data(
    path: &Path,
    test_split: f64,
    split_seed: u64,
    target_column: &str,
) -> Result<(Dataset, Dataset), TrainerError> {
    if !(0.0..1.0).contains(&test_split) {
        return Err(TrainerError::hyperparameter(
            "test_split",
            format!("must be in [0, 1), got {}", test_split),
        ));
    }

    let mut dataset = read_csv(path, target_column)?;
    if dataset.is_empty() {
        return Err(TrainerError::dataset(path, "no data rows"));
    }

    let mut rng = StdRng::seed_from_u64(split_seed);
    dataset.shuffle(&mut rng);

    let n_train = (dataset.len() as f64 * (1.0 - test_split)) as usize;
    if n_train == 0 {
        return Err(TrainerError::dataset(
            path,
            format!(
                "test split {} leaves no training rows out of {}",
                test_split,
                dataset.len()
            ),
        ));
    }

    let (train, test) = dataset.split_at(n_train);
    log::info!(
        "Loaded {} rows with {} features from {} ({} train / {} test)",
        train.len() + test.len(),
        train.num_features(),
        path.display(),
        train.len(),
        test.len()
    );
    Ok((train, test))
}

fn read_csv(path: &Path, target_column: &str) -> Result<Dataset, TrainerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                TrainerError::dataset(path, e.to_string())
            } else {
                TrainerError::Csv(e)
            }
        })?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.len() < 2 {
        return Err(TrainerError::dataset(
            path,
            format!("need at least one feature and a target, got {} columns", headers.len()),
        ));
    }

    let target = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(target_column))
        .unwrap_or_else(|| {
            log::warn!(
                "No column named {:?} in {}; using last column {:?} as target",
                target_column,
                path.display(),
                headers[headers.len() - 1]
            );
            headers.len() - 1
        });

    let feature_names = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(_, h)| h.clone())
        .collect();

    let mut features = Vec::new();
    let mut labels = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(TrainerError::dataset(
                path,
                format!(
                    "row {} has {} columns, expected {}",
                    row + 1,
                    record.len(),
                    headers.len()
                ),
            ));
        }

        let mut values = Vec::with_capacity(headers.len() - 1);
        for (col, cell) in record.iter().enumerate() {
            // `f32::from_str` accepts "NaN" and "inf"; neither is a usable measurement.
            let value = cell
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    TrainerError::dataset(
                        path,
                        format!(
                            "row {} column {:?}: {:?} is not a number",
                            row + 1,
                            headers[col],
                            cell
                        ),
                    )
                })?;
            if col == target {
                labels.push(value);
            } else {
                values.push(value);
            }
        }
        features.push(values);
    }

    Ok(Dataset {
        feature_names,
        features,
        labels,
    })
}
