//! Structured response decoding for model output.
//!
//! Model responses are expected to carry a JSON payload, but frequently
//! surround it with explanatory prose, markdown fences, or stray
//! whitespace. Decoding is a two-stage contract:
//!
//! 1. Attempt a strict parse of the whole (trimmed) response.
//! 2. Extract the *last* balanced brace-delimited object in the response
//!    (or, for array payloads, the first balanced bracket-delimited
//!    array), normalize embedded whitespace, and parse that substring
//!    alone.
//!
//! If both stages fail the caller gets a [`ResearchError::Decode`];
//! recovery policy belongs to the caller, not to this module.

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{ResearchError, ResearchResult};

fn space_after_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([{,])\s+").expect("valid regex literal"))
}

fn space_before_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([},])").expect("valid regex literal"))
}

fn whitespace_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex literal"))
}

/// Decode a JSON object of type `T` from a model response.
///
/// Tries the whole payload first, then falls back to the last balanced
/// `{...}` substring with whitespace cleanup applied.
pub fn decode_object<T: DeserializeOwned>(content: &str) -> ResearchResult<T> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<T>(trimmed) {
        return Ok(value);
    }

    let candidate = last_balanced(trimmed, '{', '}').ok_or_else(|| {
        ResearchError::Decode(format!("No JSON object found in response: {trimmed}"))
    })?;

    let cleaned = normalize_json(candidate);
    serde_json::from_str::<T>(&cleaned).map_err(|e| {
        tracing::warn!(error = %e, cleaned = %cleaned, "Failed to parse extracted JSON object");
        ResearchError::Decode(e.to_string())
    })
}

/// Decode a JSON array of strings from a model response.
///
/// Tries the whole payload first, then the first balanced `[...]`
/// substring. Used by the query planner, whose payload is a bare array
/// rather than an object.
pub fn decode_string_array(content: &str) -> ResearchResult<Vec<String>> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Vec<String>>(trimmed) {
        return Ok(value);
    }

    let candidate = first_balanced(trimmed, '[', ']').ok_or_else(|| {
        ResearchError::Decode(format!("No JSON array found in response: {trimmed}"))
    })?;

    serde_json::from_str::<Vec<String>>(candidate).map_err(|e| {
        tracing::warn!(error = %e, candidate = %candidate, "Failed to parse extracted JSON array");
        ResearchError::Decode(e.to_string())
    })
}

/// Normalize an extracted JSON substring before the strict parse.
///
/// Strips newlines/tabs, collapses whitespace runs, and removes padding
/// around structural braces and commas. Whitespace inside string values
/// is collapsed too; the payloads decoded here are short snippets where
/// that is acceptable.
fn normalize_json(raw: &str) -> String {
    let no_control = raw.replace(['\n', '\r', '\t'], "");
    let collapsed = whitespace_run_re().replace_all(&no_control, " ");
    let after_open = space_after_open_re().replace_all(&collapsed, "$1");
    let before_close = space_before_close_re().replace_all(&after_open, "$1");
    before_close.trim().to_string()
}

/// Find the last balanced `open...close` substring in `content`.
///
/// The scan is quote-aware so that delimiters inside string literals do
/// not affect nesting depth. Arbitrary nesting is tolerated.
fn last_balanced(content: &str, open: char, close: char) -> Option<&str> {
    scan_balanced(content, open, close).last()
}

/// Find the first balanced `open...close` substring in `content`.
fn first_balanced(content: &str, open: char, close: char) -> Option<&str> {
    scan_balanced(content, open, close).next()
}

fn scan_balanced<'a>(
    content: &'a str,
    open: char,
    close: char,
) -> impl Iterator<Item = &'a str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in content.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            c if c == open => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            c if c == close && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&content[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    spans.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_decode_whole_payload() {
        let value: Value = decode_object(r#"{"need_more": true, "confidence": 0.5}"#).unwrap();
        assert_eq!(value["need_more"], Value::Bool(true));
    }

    #[test]
    fn test_decode_with_surrounding_prose() {
        let content = r#"Here is my analysis:

{"need_more": false, "confidence": 0.9}

Let me know if you need anything else."#;
        let value: Value = decode_object(content).unwrap();
        assert_eq!(value["confidence"], serde_json::json!(0.9));
    }

    #[test]
    fn test_decode_takes_last_object() {
        let content = r#"{"draft": true} final version: {"draft": false}"#;
        let value: Value = decode_object(content).unwrap();
        assert_eq!(value["draft"], Value::Bool(false));
    }

    #[test]
    fn test_decode_nested_objects() {
        let content = r#"thinking... {"evidence": {"slot": {"quote": "4-2"}}, "need_more": false}"#;
        let value: Value = decode_object(content).unwrap();
        assert_eq!(value["evidence"]["slot"]["quote"], Value::String("4-2".into()));
    }

    #[test]
    fn test_decode_cleans_embedded_newlines() {
        let content = "{\n  \"slots\": [\"a\"],\n\t\"filled\": [true]\n}";
        let value: Value = decode_object(content).unwrap();
        assert_eq!(value["filled"][0], Value::Bool(true));
    }

    #[test]
    fn test_decode_ignores_braces_in_strings() {
        // The prose prefix forces the extraction path, and the braces
        // inside the string value must not confuse the depth scan.
        let content = r#"Result: {"reasoning": "use {braces} carefully", "need_more": true}"#;
        let value: Value = decode_object(content).unwrap();
        assert_eq!(
            value["reasoning"],
            Value::String("use {braces} carefully".into())
        );
    }

    #[test]
    fn test_decode_no_object_fails() {
        let result = decode_object::<Value>("no json here at all");
        assert!(matches!(result, Err(ResearchError::Decode(_))));
    }

    #[test]
    fn test_decode_unbalanced_fails() {
        let result = decode_object::<Value>(r#"{"open": true"#);
        assert!(matches!(result, Err(ResearchError::Decode(_))));
    }

    #[test]
    fn test_string_array_whole_payload() {
        let queries = decode_string_array(r#"["one", "two", "three"]"#).unwrap();
        assert_eq!(queries, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_string_array_embedded_in_prose() {
        let content = r#"Sure! Here are the queries:
["kubernetes hpa", "keda scaling"]"#;
        let queries = decode_string_array(content).unwrap();
        assert_eq!(queries.len(), 2);
    }

    #[test]
    fn test_string_array_rejects_non_strings() {
        let result = decode_string_array(r#"[1, 2, 3]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_string_array_missing_fails() {
        let result = decode_string_array("no list in this response");
        assert!(matches!(result, Err(ResearchError::Decode(_))));
    }
}
