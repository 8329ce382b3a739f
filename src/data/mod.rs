//! Tabular dataset loading, splitting, shuffling and normalization.

mod loader;
mod normalize;

pub use loader::{DEFAULT_SPLIT_SEED, DEFAULT_TARGET_COLUMN, Dataset, load_data};
pub use normalize::{Normalizer, normalize_data};
