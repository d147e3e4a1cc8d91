//! The seam between the invoker and a concrete model service

use anyhow::Result;
use async_trait::async_trait;
use core_pipeline::ExtractionRequest;

/// A hosted vision model that answers an image + prompt with text
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Make exactly one call and return the model's raw reply text
    async fn complete(&self, request: &ExtractionRequest<'_>) -> Result<String>;
}
