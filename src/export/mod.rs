//! Serving-model export.
//!
//! A trained [`Regressor`](crate::model::Regressor) plus the feature
//! [`Normalizer`](crate::data::Normalizer) is written as a single JSON
//! instruction model that maps raw feature rows to a predicted price.
//! [`ServingModel`] evaluates such a file without a tensor backend.

mod exporter;
mod format;
mod serving;

pub use exporter::{DEFAULT_EXPORTS_TO_KEEP, LatestExporter};
pub use format::{InstructionExport, InstructionModelExport, to_instruction_model};
pub use serving::ServingModel;
