//! Error types for the labelbench pipeline
//!
//! Only pre-flight problems are errors. A model call that fails is data
//! (`Outcome::Failure`), and a reply that is not JSON is data too
//! (`Extraction::RawText`).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run before any model is called
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No image path was given on the command line
    #[error("missing image path argument")]
    MissingArgument,

    /// The API credential environment variable is unset or empty
    #[error("{0} environment variable not set")]
    MissingCredential(String),

    /// The image path does not name a readable file
    #[error("image file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Decoding or re-encoding the image failed
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = PipelineError::MissingCredential("ANTHROPIC_API_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "ANTHROPIC_API_KEY environment variable not set"
        );

        let err = PipelineError::FileNotFound(PathBuf::from("/no/such/label.jpg"));
        assert_eq!(err.to_string(), "image file not found: /no/such/label.jpg");
    }
}
