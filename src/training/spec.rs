//! Train and evaluation specifications.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::input::InputFn;
use crate::export::LatestExporter;

/// Number of optimizer steps for `num_epochs` passes over `num_examples`.
///
/// Fractional step counts are truncated; at least one step is always run.
pub fn train_steps(num_epochs: f64, num_examples: usize, batch_size: usize) -> usize {
    let steps = num_epochs * num_examples as f64 / batch_size.max(1) as f64;
    (steps.floor() as usize).max(1)
}

/// What to train on and for how long.
#[derive(Debug, Clone)]
pub struct TrainSpec {
    pub input: InputFn,
    /// Training stops once the global step reaches this value.
    pub max_steps: usize,
}

impl TrainSpec {
    pub fn new(input: InputFn, max_steps: usize) -> Self {
        Self {
            input,
            max_steps: max_steps.max(1),
        }
    }
}

/// What to evaluate on, how often, and what to export afterwards.
#[derive(Debug, Clone)]
pub struct EvalSpec {
    pub input: InputFn,
    /// Maximum number of batches per evaluation; `None` consumes the whole split.
    pub steps: Option<usize>,
    /// No evaluation before this much time has passed since training started.
    pub start_delay: Duration,
    /// Minimum time between two evaluations.
    pub throttle: Duration,
    pub exporters: Vec<LatestExporter>,
}

impl EvalSpec {
    pub fn new(input: InputFn) -> Self {
        Self {
            input,
            steps: None,
            start_delay: Duration::from_secs(10),
            throttle: Duration::from_secs(10),
            exporters: Vec::new(),
        }
    }

    pub fn steps(mut self, steps: Option<usize>) -> Self {
        self.steps = steps;
        self
    }

    pub fn start_delay_secs(mut self, secs: u64) -> Self {
        self.start_delay = Duration::from_secs(secs);
        self
    }

    pub fn throttle_secs(mut self, secs: u64) -> Self {
        self.throttle = Duration::from_secs(secs);
        self
    }

    pub fn exporter(mut self, exporter: LatestExporter) -> Self {
        self.exporters.push(exporter);
        self
    }
}

/// Metrics from one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub global_step: usize,
    /// Mean squared error.
    pub loss: f32,
    /// Mean absolute error.
    pub mae: f32,
    pub num_examples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_steps_arithmetic() {
        assert_eq!(train_steps(500.0, 323, 128), 1261);
        assert_eq!(train_steps(1.0, 256, 128), 2);
        assert_eq!(train_steps(2.5, 100, 50), 5);
    }

    #[test]
    fn test_train_steps_at_least_one() {
        assert_eq!(train_steps(0.1, 10, 128), 1);
    }
}
