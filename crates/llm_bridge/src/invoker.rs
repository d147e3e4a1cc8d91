//! Model invocation with latency measurement
//!
//! Each call is timed and its outcome captured as data, so one model
//! failing never stops the other from being tried and reported.

use crate::backend::VisionBackend;
use core_pipeline::{
    normalize, ExtractionRequest, ExtractionResult, ModelSpec, Outcome, PreparedImage,
};
use std::time::Instant;
use tracing::{info, warn};

/// Call one model once and normalize its reply
pub async fn invoke(
    backend: &dyn VisionBackend,
    model: &ModelSpec,
    image: &PreparedImage,
    prompt: &str,
) -> ExtractionResult {
    let request = ExtractionRequest {
        model,
        prompt,
        image,
    };

    info!("Testing {} ({})", model.display_name, model.id);
    let started = Instant::now();
    let reply = backend.complete(&request).await;
    let latency = started.elapsed();

    let outcome = match reply {
        Ok(text) => {
            info!("{} answered in {} ms", model.display_name, latency.as_millis());
            Outcome::Success(normalize(&text))
        }
        Err(e) => {
            warn!("{} failed after {} ms: {:#}", model.display_name, latency.as_millis(), e);
            Outcome::Failure(format!("{:#}", e))
        }
    };

    ExtractionResult {
        model: model.clone(),
        latency,
        outcome,
    }
}

/// Run both models one after the other against the same image
pub async fn run_comparison(
    backend: &dyn VisionBackend,
    models: &[ModelSpec; 2],
    image: &PreparedImage,
    prompt: &str,
) -> (ExtractionResult, ExtractionResult) {
    let first = invoke(backend, &models[0], image, prompt).await;
    let second = invoke(backend, &models[1], image, prompt).await;
    (first, second)
}
