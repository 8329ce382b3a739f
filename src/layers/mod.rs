//! Neural network layer implementations.

pub mod activation;
pub mod dense;

pub use activation::Activation;
pub use dense::{Dense, DenseConfig, DenseParams};
