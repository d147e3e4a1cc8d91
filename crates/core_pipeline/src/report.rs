//! Comparison report
//!
//! Summarizes two extraction results side by side: wine counts, confidence
//! histograms, the latency difference and a few plain-language notes.
//! Building the report is pure; [`ComparisonReport::render`] does the output.

use crate::types::{
    ConfidenceDistribution, Extraction, ExtractionResult, ModelSpec, Outcome, PreparedImage,
    WineRecord,
};
use serde::Serialize;
use std::io::{self, Write};

/// Static annotation printed when both models answered.
///
/// Not computed from pricing data; update by hand if the model pair changes.
pub const COST_NOTE: &str = "The first model is billed at roughly a third of the second \
model's per-token rate (static note, not derived from current pricing).";

/// Number of wines in an extraction; `None` when the reply was not parsed
pub fn count_wines(extraction: &Extraction) -> Option<usize> {
    match extraction {
        Extraction::Record(_) => Some(1),
        Extraction::RecordList(records) => Some(records.len()),
        Extraction::RawText(_) => None,
    }
}

/// Confidence histogram over every record in an extraction
pub fn confidence_distribution(extraction: &Extraction) -> ConfidenceDistribution {
    ConfidenceDistribution::from_records(extraction.records())
}

/// Latency difference between the second and first model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyDelta {
    pub first_ms: u64,
    pub second_ms: u64,
    /// `second - first`; positive when the first model was faster
    pub delta_ms: i64,
    /// `delta / second * 100`, zero when the second latency is zero
    pub percent: f64,
}

impl LatencyDelta {
    pub fn between(first_ms: u64, second_ms: u64) -> Self {
        let delta_ms = second_ms as i64 - first_ms as i64;
        let percent = if second_ms == 0 {
            0.0
        } else {
            delta_ms as f64 / second_ms as f64 * 100.0
        };
        Self {
            first_ms,
            second_ms,
            delta_ms,
            percent,
        }
    }
}

/// What one model produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelStatus {
    Failed {
        error: String,
    },
    Extracted {
        wine_count: usize,
        confidence: ConfidenceDistribution,
        wines: Vec<WineRecord>,
    },
    Unparsed {
        raw_text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model: ModelSpec,
    pub latency_ms: u64,
    #[serde(flatten)]
    pub status: ModelStatus,
}

impl ModelSummary {
    pub fn from_result(result: &ExtractionResult) -> Self {
        let status = match &result.outcome {
            Outcome::Failure(message) => ModelStatus::Failed {
                error: message.clone(),
            },
            Outcome::Success(Extraction::RawText(text)) => ModelStatus::Unparsed {
                raw_text: text.clone(),
            },
            Outcome::Success(extraction) => ModelStatus::Extracted {
                wine_count: count_wines(extraction).unwrap_or_default(),
                confidence: confidence_distribution(extraction),
                wines: extraction.records().to_vec(),
            },
        };

        Self {
            model: result.model.clone(),
            latency_ms: result.latency_ms(),
            status,
        }
    }

    fn wine_count(&self) -> Option<usize> {
        match &self.status {
            ModelStatus::Extracted { wine_count, .. } => Some(*wine_count),
            _ => None,
        }
    }
}

/// Size information about the image that was sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub media_type: String,
    pub size_bytes: u64,
    pub original_size_bytes: u64,
    pub resized: bool,
}

impl From<&PreparedImage> for ImageSummary {
    fn from(image: &PreparedImage) -> Self {
        Self {
            media_type: image.media_type.to_string(),
            size_bytes: image.size_bytes,
            original_size_bytes: image.original_size_bytes,
            resized: image.resized,
        }
    }
}

/// Side-by-side summary of two model runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSummary>,
    pub first: ModelSummary,
    pub second: ModelSummary,
    /// Present only when both calls succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyDelta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_note: Option<&'static str>,
    pub notes: Vec<String>,
}

impl ComparisonReport {
    pub fn new(first: &ExtractionResult, second: &ExtractionResult) -> Self {
        let both_succeeded = first.is_success() && second.is_success();
        let latency =
            both_succeeded.then(|| LatencyDelta::between(first.latency_ms(), second.latency_ms()));

        let first = ModelSummary::from_result(first);
        let second = ModelSummary::from_result(second);
        let notes = qualitative_notes(&first, &second, latency.as_ref());

        Self {
            image: None,
            first,
            second,
            latency,
            cost_note: both_succeeded.then_some(COST_NOTE),
            notes,
        }
    }

    pub fn with_image(mut self, image: &PreparedImage) -> Self {
        self.image = Some(ImageSummary::from(image));
        self
    }

    /// Write the human-readable report
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "=== Wine label extraction comparison ===")?;
        if let Some(image) = &self.image {
            if image.resized {
                writeln!(
                    out,
                    "Image: {} bytes ({}, downscaled from {} bytes)",
                    image.size_bytes, image.media_type, image.original_size_bytes
                )?;
            } else {
                writeln!(out, "Image: {} bytes ({})", image.size_bytes, image.media_type)?;
            }
        }

        for summary in [&self.first, &self.second] {
            writeln!(out)?;
            render_model(summary, out)?;
        }

        writeln!(out)?;
        writeln!(out, "--- Comparison ---")?;
        match &self.latency {
            Some(latency) => {
                writeln!(
                    out,
                    "Latency: {} {} ms vs {} {} ms",
                    self.first.model.display_name,
                    latency.first_ms,
                    self.second.model.display_name,
                    latency.second_ms
                )?;
                writeln!(
                    out,
                    "Latency delta: {} ms ({:.1}% of {})",
                    latency.delta_ms, latency.percent, self.second.model.display_name
                )?;
            }
            None => writeln!(out, "Latency delta: n/a (at least one model failed)")?,
        }
        if let Some(note) = self.cost_note {
            writeln!(out, "Cost: {}", note)?;
        }
        if !self.notes.is_empty() {
            writeln!(out, "Notes:")?;
            for note in &self.notes {
                writeln!(out, "  - {}", note)?;
            }
        }
        Ok(())
    }
}

fn render_model<W: Write>(summary: &ModelSummary, out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "--- {} ({}) ---",
        summary.model.display_name, summary.model.id
    )?;
    writeln!(out, "Latency: {} ms", summary.latency_ms)?;

    match &summary.status {
        ModelStatus::Failed { error } => writeln!(out, "Error: {}", error)?,
        ModelStatus::Extracted {
            wine_count,
            confidence,
            wines,
        } => {
            writeln!(out, "Wines found: {}", wine_count)?;
            for wine in wines {
                match wine.confidence_level {
                    Some(level) => writeln!(out, "  * {} [confidence {}]", wine.summary(), level)?,
                    None => writeln!(out, "  * {}", wine.summary())?,
                }
            }
            if confidence.is_empty() {
                writeln!(out, "Confidence levels: none reported")?;
            } else {
                writeln!(out, "Confidence levels:")?;
                for (label, count) in confidence.labelled() {
                    writeln!(out, "  {}: {}", label, count)?;
                }
            }
        }
        ModelStatus::Unparsed { raw_text } => {
            writeln!(out, "Raw response (not parseable as JSON):")?;
            for line in raw_text.lines() {
                writeln!(out, "  {}", line)?;
            }
        }
    }
    Ok(())
}

fn qualitative_notes(
    first: &ModelSummary,
    second: &ModelSummary,
    latency: Option<&LatencyDelta>,
) -> Vec<String> {
    let mut notes = Vec::new();

    for summary in [first, second] {
        match summary.status {
            ModelStatus::Failed { .. } => notes.push(format!(
                "{} failed; its results are missing from the comparison",
                summary.model.display_name
            )),
            ModelStatus::Unparsed { .. } => notes.push(format!(
                "{} did not return parseable JSON",
                summary.model.display_name
            )),
            ModelStatus::Extracted { .. } => {}
        }
    }

    if let Some(latency) = latency {
        let (faster, slower) = if latency.delta_ms >= 0 {
            (first, second)
        } else {
            (second, first)
        };
        if latency.delta_ms == 0 {
            notes.push("Both models answered in the same time".to_string());
        } else {
            notes.push(format!(
                "{} answered {} ms faster than {}",
                faster.model.display_name,
                latency.delta_ms.unsigned_abs(),
                slower.model.display_name
            ));
        }
    }

    if let (Some(a), Some(b)) = (first.wine_count(), second.wine_count()) {
        if a == b {
            notes.push(format!("Both models found {} wine(s)", a));
        } else {
            notes.push(format!(
                "Wine counts differ: {} found {}, {} found {}",
                first.model.display_name, a, second.model.display_name, b
            ));
        }
    }

    notes
}
