//! Error types.

mod trainer_error;

pub use trainer_error::TrainerError;
