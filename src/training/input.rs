//! Input functions: turn an in-memory dataset into tensor batches.

use burn::tensor::{Tensor, TensorData, backend::Backend};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::data::Dataset;
use crate::errors::TrainerError;

/// Whether batches are produced for training or evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Reshuffled every pass and repeated indefinitely.
    Train,
    /// One ordered pass.
    Eval,
}

/// One batch of features `[b, f]` and labels `[b, 1]`.
#[derive(Debug, Clone)]
pub struct Batch<B: Backend> {
    pub features: Tensor<B, 2>,
    pub labels: Tensor<B, 2>,
}

impl<B: Backend> Batch<B> {
    pub fn len(&self) -> usize {
        self.labels.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dataset bound to a batch size and a mode.
#[derive(Debug, Clone)]
pub struct InputFn {
    features: Vec<Vec<f32>>,
    labels: Vec<f32>,
    num_features: usize,
    batch_size: usize,
    mode: Mode,
}

impl InputFn {
    pub fn new(dataset: &Dataset, batch_size: usize, mode: Mode) -> Result<Self, TrainerError> {
        if batch_size == 0 {
            return Err(TrainerError::hyperparameter("batch_size", "must be at least 1"));
        }
        if mode == Mode::Train && dataset.is_empty() {
            return Err(TrainerError::hyperparameter(
                "train_file",
                "training split is empty",
            ));
        }
        if let Some(row) = dataset
            .features
            .iter()
            .find(|r| r.len() != dataset.num_features())
        {
            return Err(TrainerError::ShapeMismatch {
                expected: dataset.num_features(),
                actual: row.len(),
            });
        }

        Ok(Self {
            features: dataset.features.clone(),
            labels: dataset.labels.clone(),
            num_features: dataset.num_features(),
            batch_size,
            mode,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns an iterator of batches on `device`.
    ///
    /// In [`Mode::Train`] the iterator never ends; callers bound it by steps.
    pub fn batches<'a, B: Backend>(&'a self, device: &B::Device, rng: StdRng) -> Batches<'a, B> {
        let mut batches = Batches {
            input: self,
            device: device.clone(),
            order: (0..self.len()).collect(),
            cursor: 0,
            rng,
        };
        if self.mode == Mode::Train {
            batches.order.shuffle(&mut batches.rng);
        }
        batches
    }

    fn make_batch<B: Backend>(&self, rows: &[usize], device: &B::Device) -> Batch<B> {
        let mut flat = Vec::with_capacity(rows.len() * self.num_features);
        let mut labels = Vec::with_capacity(rows.len());
        for &i in rows {
            flat.extend_from_slice(&self.features[i]);
            labels.push(self.labels[i]);
        }

        Batch {
            features: Tensor::from_data(
                TensorData::new(flat, [rows.len(), self.num_features]),
                device,
            ),
            labels: Tensor::from_data(TensorData::new(labels, [rows.len(), 1]), device),
        }
    }
}

/// Iterator over the batches of an [`InputFn`].
pub struct Batches<'a, B: Backend> {
    input: &'a InputFn,
    device: B::Device,
    order: Vec<usize>,
    cursor: usize,
    rng: StdRng,
}

impl<B: Backend> Iterator for Batches<'_, B> {
    type Item = Batch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.order.is_empty() {
            return None;
        }

        if self.cursor >= self.order.len() {
            match self.input.mode {
                Mode::Eval => return None,
                Mode::Train => {
                    self.order.shuffle(&mut self.rng);
                    self.cursor = 0;
                }
            }
        }

        let end = (self.cursor + self.input.batch_size).min(self.order.len());
        let batch = self
            .input
            .make_batch(&self.order[self.cursor..end], &self.device);
        self.cursor = end;
        Some(batch)
    }
}
