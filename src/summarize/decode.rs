//! Decoding of free-form model output into typed records.
//!
//! Models do not reliably follow the requested schema, so decoding is lenient
//! about field shapes but strict about the top-level JSON value. Callers pick
//! the fallback when decoding fails.

use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::paper::{DeepAnalysis, InsightEntry, Insights, ResearchDirection};

/// Strip a surrounding ```` ```json ```` fence, if any
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) up to the first newline
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse(raw: &str) -> Result<Value, DecodeError> {
    Ok(serde_json::from_str(strip_code_fences(raw))?)
}

/// Decode a deep-analysis object.
///
/// A string where a list is expected becomes a one-element list, non-string
/// list elements are rendered as JSON text, anything else is an empty list.
pub fn decode_deep_analysis(raw: &str) -> Result<DeepAnalysis, DecodeError> {
    let Value::Object(map) = parse(raw)? else {
        return Err(DecodeError::UnexpectedShape("a JSON object"));
    };
    Ok(DeepAnalysis {
        contributions: string_list(map.get("contributions")),
        methods: string_list(map.get("methods")),
        results: string_list(map.get("results")),
        limitations: string_list(map.get("limitations")),
        relations: string_list(map.get("relations")),
        applications: string_list(map.get("applications")),
    })
}

/// Decode the cross-paper insights object. Missing keys become empty lists.
pub fn decode_insights(raw: &str) -> Result<Insights, DecodeError> {
    let Value::Object(map) = parse(raw)? else {
        return Err(DecodeError::UnexpectedShape("a JSON object"));
    };
    let mut insights = Insights::default();
    for key in Insights::KEYS {
        if let Some(section) = insights.section_mut(key) {
            *section = insight_entries(map.get(key));
        }
    }
    Ok(insights)
}

/// Decode research directions from `{"projects": [...]}` or a bare array.
pub fn decode_directions(raw: &str) -> Result<Vec<ResearchDirection>, DecodeError> {
    let items = match parse(raw)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("projects") {
            Some(Value::Array(items)) => items,
            _ => return Err(DecodeError::UnexpectedShape("a \"projects\" array")),
        },
        _ => return Err(DecodeError::UnexpectedShape("an object or array")),
    };

    Ok(items
        .iter()
        .filter_map(Value::as_object)
        .map(direction_from_map)
        .collect())
}

fn direction_from_map(map: &Map<String, Value>) -> ResearchDirection {
    let field = |key: &str| map.get(key).map(value_text).unwrap_or_default();
    ResearchDirection {
        title: field("title"),
        motivation: field("motivation"),
        approach: field("approach"),
        expected_contribution: field("expected_contribution"),
        required_resources: field("required_resources"),
        timeline: field("timeline"),
        difficulty: field("difficulty"),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(value_text).filter(|s| !s.is_empty()).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn insight_entries(value: Option<&Value>) -> Vec<InsightEntry> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(InsightEntry::Text(s.clone())),
            Value::Object(map) => {
                let title = map.get("item").map(value_text)?;
                let details = map.get("details").map(value_text).unwrap_or_default();
                Some(InsightEntry::Detailed { item: title, details })
            }
            _ => None,
        })
        .collect()
}

/// Strings as-is, lists joined with "; ", null as empty, everything else as JSON
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join("; "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
    }

    #[test]
    fn test_deep_analysis_lenient_fields() {
        let raw = r#"{"contributions": "single", "methods": ["a", 3], "results": {"x": 1}}"#;
        let analysis = decode_deep_analysis(raw).unwrap();
        assert_eq!(analysis.contributions, vec!["single"]);
        assert_eq!(analysis.methods, vec!["a", "3"]);
        assert!(analysis.results.is_empty());
        assert!(analysis.applications.is_empty());
    }

    #[test]
    fn test_deep_analysis_rejects_non_object() {
        assert!(decode_deep_analysis("[1, 2]").is_err());
        assert!(decode_deep_analysis("not json").is_err());
    }

    #[test]
    fn test_insights_mixed_entries() {
        let raw = r#"{"common_methods": ["ViT", {"item": "CLIP", "details": "contrastive"}, 7], "metrics": "BLEU"}"#;
        let insights = decode_insights(raw).unwrap();
        assert_eq!(insights.common_methods.len(), 2);
        assert_eq!(insights.common_methods[1].details(), Some("contrastive"));
        assert!(insights.metrics.is_empty());
        assert!(insights.research_gaps.is_empty());
    }

    #[test]
    fn test_directions_shapes() {
        let wrapped = r#"{"projects": [{"title": "A", "timeline": 6, "difficulty": "High"}]}"#;
        let directions = decode_directions(wrapped).unwrap();
        assert_eq!(directions[0].title, "A");
        assert_eq!(directions[0].timeline, "6");
        assert_eq!(directions[0].motivation, "");

        let bare = r#"[{"title": "B", "approach": ["x", "y"]}, "noise"]"#;
        let directions = decode_directions(bare).unwrap();
        assert_eq!(directions.len(), 1);
        assert_eq!(directions[0].approach, "x; y");

        assert!(decode_directions(r#"{"ideas": []}"#).is_err());
    }
}
