//! Extraction prompt sent with every label image

/// Fixed instructions for reading wine labels
pub const EXTRACTION_PROMPT: &str = r#"You are reading the label of one or more wine bottles in this photo.
For each bottle, extract:
- name: the wine's name
- producer: winery or producer
- vintage: the year as a number, or null if none is printed
- region: appellation, region or country
- type: red, white, rosé, sparkling, dessert or fortified
- variety: grape variety or blend
- confidence_level: your confidence in this entry, an integer from 1 (guess) to 10 (certain)

Return JSON only. Use one object for a single bottle, or an array of objects
when several bottles are visible. Use null for any field you cannot read.
Example: {"name": "...", "producer": "...", "vintage": 2018, "region": "...", "type": "...", "variety": "...", "confidence_level": 8}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_field() {
        for field in [
            "name",
            "producer",
            "vintage",
            "region",
            "type",
            "variety",
            "confidence_level",
        ] {
            assert!(EXTRACTION_PROMPT.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn test_prompt_example_normalizes() {
        let example = EXTRACTION_PROMPT
            .split("Example: ")
            .nth(1)
            .unwrap()
            .replace("\"...\"", "\"x\"");
        let extraction = core_pipeline::normalize(&example);
        assert!(matches!(extraction, core_pipeline::Extraction::Record(_)));
    }
}
