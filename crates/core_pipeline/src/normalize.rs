//! Response normalization
//!
//! Models are asked for JSON but answer with whatever they like: fenced
//! code blocks, a sentence before the JSON, trailing commentary. This module
//! digs the JSON out when it can and otherwise keeps the reply verbatim.

use crate::types::{Extraction, WineRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static FENCED_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap());

// Widest `{...}` or `[...]` span starting at the first opening bracket
static JSON_SPAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}|\[.*\]").unwrap());

/// Turn a free-text model reply into structured records, never failing
pub fn normalize(raw: &str) -> Extraction {
    match parse_records(raw) {
        Some(extraction) => extraction,
        None => {
            debug!("Reply is not parseable JSON; keeping raw text");
            Extraction::RawText(raw.to_string())
        }
    }
}

/// The JSON candidate inside a reply, if any
fn json_candidate(raw: &str) -> Option<&str> {
    let candidate = FENCED_BLOCK_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str());

    JSON_SPAN_RE.find(candidate).map(|m| m.as_str())
}

fn parse_records(raw: &str) -> Option<Extraction> {
    let candidate = json_candidate(raw)?;
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Array(items) => Some(Extraction::RecordList(
            items.into_iter().map(record_from_value).collect(),
        )),
        value => Some(Extraction::Record(record_from_value(value))),
    }
}

/// Objects decode field by field; anything else is kept under `extra["value"]`
fn record_from_value(value: Value) -> WineRecord {
    match value {
        Value::Object(map) => serde_json::from_value(Value::Object(map.clone()))
            .unwrap_or_else(|e| {
                debug!("Record did not decode ({}); keeping its fields as extra", e);
                WineRecord {
                    extra: map,
                    ..Default::default()
                }
            }),
        other => {
            debug!("Array element is not an object: {}", other);
            let mut extra = Map::new();
            extra.insert("value".to_string(), other);
            WineRecord {
                extra,
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json_object() {
        let raw = "Here is what I found:\n```json\n{\"name\":\"Test\",\"confidence_level\":7}\n```\nLet me know!";

        match normalize(raw) {
            Extraction::Record(record) => {
                assert_eq!(record.name.as_deref(), Some("Test"));
                assert_eq!(record.confidence_level, Some(7));
            }
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn test_untagged_fence() {
        let raw = "```\n[{\"name\":\"A\"},{\"name\":\"B\"}]\n```";

        match normalize(raw) {
            Extraction::RecordList(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[1].name.as_deref(), Some("B"));
            }
            other => panic!("expected a list, got {:?}", other),
        }
    }

    #[test]
    fn test_json_surrounded_by_prose() {
        let raw = "The label reads {\"name\": \"Cuvee\", \"vintage\": 2015} as far as I can tell.";

        match normalize(raw) {
            Extraction::Record(record) => {
                assert_eq!(record.name.as_deref(), Some("Cuvee"));
                assert_eq!(record.vintage, Some(2015));
            }
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn test_blend_variety_still_counts() {
        let raw = "{\"name\":\"Cuvee\",\"variety\":[\"Cabernet Sauvignon\",\"Merlot\"],\"region\":{\"country\":\"France\"},\"confidence_level\":8}";

        let extraction = normalize(raw);
        match &extraction {
            Extraction::Record(record) => {
                assert_eq!(record.name.as_deref(), Some("Cuvee"));
                assert_eq!(
                    record.variety.as_deref(),
                    Some("Cabernet Sauvignon, Merlot")
                );
                assert_eq!(record.confidence_level, Some(8));
            }
            other => panic!("expected a record, got {:?}", other),
        }
        assert_eq!(crate::report::count_wines(&extraction), Some(1));
        assert_eq!(
            crate::report::confidence_distribution(&extraction).count(8),
            1
        );
    }

    #[test]
    fn test_no_json_returns_raw_text() {
        let raw = "I cannot read this label, the photo is too blurry.";
        assert_eq!(normalize(raw), Extraction::RawText(raw.to_string()));
    }

    #[test]
    fn test_invalid_json_returns_raw_text() {
        let raw = "```json\n{\"name\": \"Broken\",, }\n```";
        assert_eq!(normalize(raw), Extraction::RawText(raw.to_string()));
    }

    #[test]
    fn test_array_with_non_objects_keeps_every_element() {
        let raw = "[{\"name\":\"A\",\"confidence_level\":5}, \"unreadable\", 3]";

        match normalize(raw) {
            Extraction::RecordList(records) => {
                assert_eq!(records.len(), 3);
                assert_eq!(records[0].name.as_deref(), Some("A"));
                assert_eq!(records[1].extra["value"], "unreadable");
                assert_eq!(records[2].extra["value"], 3);
                assert_eq!(records[2].confidence_level, None);
            }
            other => panic!("expected a list, got {:?}", other),
        }
    }

    #[test]
    fn test_widest_span_is_used() {
        let raw = "{\"a\": 1} and then {\"b\": 2}";
        // Greedy span covers both objects, which is not valid JSON
        assert_eq!(json_candidate(raw), Some(raw));
        assert_eq!(normalize(raw), Extraction::RawText(raw.to_string()));
    }

    #[test]
    fn test_first_bracket_kind_wins() {
        let raw = "wines: [{\"name\": \"X\"}] done";
        assert_eq!(json_candidate(raw), Some("[{\"name\": \"X\"}]"));
    }
}
