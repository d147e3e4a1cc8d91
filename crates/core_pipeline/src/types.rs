//! Core types for the labelbench pipeline
//!
//! Everything here lives for a single run: an image is prepared, sent to two
//! models, their replies are normalized into [`Extraction`] values and then
//! summarized. Nothing is persisted.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Image MIME types accepted by the model service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MediaType {
    /// Infer the media type from a file extension, defaulting to JPEG
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => MediaType::Jpeg,
            "png" => MediaType::Png,
            "gif" => MediaType::Gif,
            "webp" => MediaType::Webp,
            _ => MediaType::Jpeg,
        }
    }

    /// Infer the media type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaType::Jpeg)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image ready to be sent to a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    /// Encoded image bytes (original or re-encoded JPEG)
    pub bytes: Vec<u8>,
    /// Declared media type of `bytes`
    pub media_type: MediaType,
    /// Length of `bytes`
    pub size_bytes: u64,
    /// Size of the file on disk before preparation
    pub original_size_bytes: u64,
    /// True if the image was downscaled and re-encoded
    pub resized: bool,
}

/// A model to benchmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Identifier sent to the model service
    pub id: String,
    /// Human-readable name used in the report
    pub display_name: String,
}

impl ModelSpec {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A single extraction request, built fresh for each model
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    pub model: &'a ModelSpec,
    pub prompt: &'a str,
    pub image: &'a PreparedImage,
}

/// Wine metadata read from a bottle label
///
/// Models omit fields they cannot read, so every field is optional. Keys
/// outside the known set are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WineRecord {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub producer: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_vintage",
        skip_serializing_if = "Option::is_none"
    )]
    pub vintage: Option<i32>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub region: Option<String>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub wine_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub variety: Option<String>,
    /// Self-reported certainty, 1 to 10
    #[serde(
        default,
        deserialize_with = "lenient_confidence",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_level: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WineRecord {
    /// One-line summary such as `Chateau X Reserve (Chateau X, 2018)`
    pub fn summary(&self) -> String {
        let name = self.name.as_deref().unwrap_or("unnamed wine");
        let mut details = Vec::new();
        if let Some(producer) = &self.producer {
            details.push(producer.clone());
        }
        if let Some(vintage) = self.vintage {
            details.push(vintage.to_string());
        }
        if let Some(region) = &self.region {
            details.push(region.clone());
        }
        if details.is_empty() {
            name.to_string()
        } else {
            format!("{} ({})", name, details.join(", "))
        }
    }
}

/// Keeps strings, joins arrays (`["Merlot", "Cabernet"]` -> `Merlot, Cabernet`)
/// and stringifies other scalars or objects; empty values are `None`
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_like))
}

fn text_like(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(text_like)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Accepts `2018`, `2018.0` or `"2018"`; anything else (e.g. `"NV"`) is `None`
fn lenient_vintage<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(integer_like)
        .and_then(|year| i32::try_from(year).ok()))
}

/// Accepts integers, floats (rounded) or numeric strings within 1..=10
fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(integer_like)
        .filter(|level| (1..=10).contains(level))
        .map(|level| level as u8))
}

fn integer_like(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(finite_round)),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(finite_round),
        _ => None,
    }
}

fn finite_round(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.round() as i64)
}

/// Normalized content of a model reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Extraction {
    /// A single JSON object
    Record(WineRecord),
    /// A JSON array of objects
    RecordList(Vec<WineRecord>),
    /// The reply could not be parsed; kept verbatim
    RawText(String),
}

impl Extraction {
    /// Parsed records, empty for raw text
    pub fn records(&self) -> &[WineRecord] {
        match self {
            Extraction::Record(record) => std::slice::from_ref(record),
            Extraction::RecordList(records) => records,
            Extraction::RawText(_) => &[],
        }
    }
}

/// Result of a model call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Extraction),
    Failure(String),
}

/// One model invocation: who was asked, how long it took, what came back
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub model: ModelSpec,
    /// Wall-clock time around the call, up to the failure point on errors
    pub latency: Duration,
    pub outcome: Outcome,
}

impl ExtractionResult {
    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.latency.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Count of records per confidence level
///
/// Levels are kept numerically ordered; labels render as `level{N}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfidenceDistribution(BTreeMap<u8, usize>);

impl ConfidenceDistribution {
    /// Bucket every record that reports a confidence level
    pub fn from_records(records: &[WineRecord]) -> Self {
        let mut buckets = BTreeMap::new();
        for level in records.iter().filter_map(|r| r.confidence_level) {
            *buckets.entry(level).or_insert(0) += 1;
        }
        Self(buckets)
    }

    pub fn label(level: u8) -> String {
        format!("level{}", level)
    }

    /// Count for a level, zero if absent
    pub fn count(&self, level: u8) -> usize {
        self.0.get(&level).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(label, count)` pairs in ascending level order
    pub fn labelled(&self) -> Vec<(String, usize)> {
        self.0
            .iter()
            .map(|(level, count)| (Self::label(*level), *count))
            .collect()
    }
}

impl Serialize for ConfidenceDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (level, count) in &self.0 {
            map.serialize_entry(&Self::label(*level), count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(MediaType::from_extension("jpg"), MediaType::Jpeg);
        assert_eq!(MediaType::from_extension("JPEG"), MediaType::Jpeg);
        assert_eq!(MediaType::from_extension("png"), MediaType::Png);
        assert_eq!(MediaType::from_extension("gif"), MediaType::Gif);
        assert_eq!(MediaType::from_extension("webp"), MediaType::Webp);
        assert_eq!(MediaType::from_extension("tiff"), MediaType::Jpeg);
        assert_eq!(MediaType::from_path(Path::new("label")), MediaType::Jpeg);
        assert_eq!(MediaType::Webp.to_string(), "image/webp");
    }

    #[test]
    fn test_wine_record_lenient_fields() {
        let record: WineRecord = serde_json::from_str(
            r#"{"name":"Estate Red","vintage":"2018","confidence_level":7.6,"bottle_size":"750ml"}"#,
        )
        .unwrap();
        assert_eq!(record.vintage, Some(2018));
        assert_eq!(record.confidence_level, Some(8));
        assert_eq!(record.extra["bottle_size"], "750ml");

        let record: WineRecord =
            serde_json::from_str(r#"{"vintage":"NV","confidence_level":42}"#).unwrap();
        assert_eq!(record.vintage, None);
        assert_eq!(record.confidence_level, None);
    }

    #[test]
    fn test_wine_record_non_numeric_strings() {
        let record: WineRecord =
            serde_json::from_str(r#"{"vintage":"NaN","confidence_level":"inf"}"#).unwrap();
        assert_eq!(record.vintage, None);
        assert_eq!(record.confidence_level, None);
    }

    #[test]
    fn test_wine_record_text_fields_accept_other_shapes() {
        let record: WineRecord = serde_json::from_str(
            r#"{
                "name": "  Grand Vin  ",
                "producer": 1855,
                "variety": ["Cabernet Sauvignon", "Merlot", null],
                "region": {"country": "France"},
                "type": ""
            }"#,
        )
        .unwrap();

        assert_eq!(record.name.as_deref(), Some("Grand Vin"));
        assert_eq!(record.producer.as_deref(), Some("1855"));
        assert_eq!(record.variety.as_deref(), Some("Cabernet Sauvignon, Merlot"));
        assert_eq!(record.region.as_deref(), Some(r#"{"country":"France"}"#));
        assert_eq!(record.wine_type, None);
    }

    #[test]
    fn test_wine_record_type_key() {
        let record: WineRecord = serde_json::from_str(r#"{"type":"Red"}"#).unwrap();
        assert_eq!(record.wine_type.as_deref(), Some("Red"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Red"}));
    }

    #[test]
    fn test_wine_record_summary() {
        let record = WineRecord {
            name: Some("Reserve".to_string()),
            producer: Some("Domaine Test".to_string()),
            vintage: Some(2019),
            ..Default::default()
        };
        assert_eq!(record.summary(), "Reserve (Domaine Test, 2019)");
        assert_eq!(WineRecord::default().summary(), "unnamed wine");
    }

    #[test]
    fn test_confidence_distribution_labels() {
        let records: Vec<WineRecord> = [Some(10), Some(2), None, Some(2)]
            .into_iter()
            .map(|confidence_level| WineRecord {
                confidence_level,
                ..Default::default()
            })
            .collect();
        let dist = ConfidenceDistribution::from_records(&records);

        assert_eq!(
            dist.labelled(),
            vec![("level2".to_string(), 2), ("level10".to_string(), 1)]
        );
        assert_eq!(
            serde_json::to_value(&dist).unwrap(),
            serde_json::json!({"level2": 2, "level10": 1})
        );
    }

    #[test]
    fn test_extraction_serialization() {
        let extraction = Extraction::RawText("no wine here".to_string());
        let json = serde_json::to_value(&extraction).unwrap();
        assert_eq!(json["kind"], "raw_text");
        assert_eq!(json["content"], "no wine here");
    }
}
