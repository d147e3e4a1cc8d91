//! Core pipeline for labelbench
//!
//! This crate holds the data model and the model-independent stages of a
//! label comparison run: preparing the image, normalizing model replies
//! into wine records, and building the comparison report.

pub mod error;
pub mod normalize;
pub mod prepare;
pub mod report;
pub mod types;

pub use error::{PipelineError, Result};
pub use normalize::normalize;
pub use prepare::{prepare_image, PrepareOptions};
pub use report::ComparisonReport;
pub use types::*;
