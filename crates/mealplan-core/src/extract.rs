//! Best-effort JSON extraction from raw model output.
//!
//! Steps, each tried only if the previous one did not already succeed:
//! 1. Trim, and strip a surrounding markdown code fence (with or without a
//!    language tag).
//! 2. Parse the cleaned text directly.
//! 3. Parse the span from the first `{` to the last `}`.
//!
//! When both parses fail, the error carries the cause of the span parse,
//! not the direct one.

use serde_json::Value;
use thiserror::Error;

/// Model output that could not be turned into JSON.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Direct parse failed and there was no `{ ... }` span to fall back to.
    #[error("no JSON object found in model output: {0}")]
    NoObject(#[source] serde_json::Error),

    /// Direct parse failed and the `{ ... }` span did not parse either.
    #[error("invalid JSON in model output: {0}")]
    InvalidObject(#[source] serde_json::Error),
}

/// Extract a JSON value from raw model text.
pub fn extract_json(raw: &str) -> Result<Value, ExtractError> {
    let cleaned = strip_code_fence(raw);

    let direct_err = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<Value>(&cleaned[start..=end]).map_err(ExtractError::InvalidObject)
        }
        _ => Err(ExtractError::NoObject(direct_err)),
    }
}

/// Trim whitespace and remove an enclosing ```` ``` ```` fence.
///
/// Only applies when the trimmed text starts with a fence; the language tag
/// (e.g. `json`) is whatever follows the opening marker on its line.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let body = match rest.find('\n') {
        Some(nl) if is_language_tag(&rest[..nl]) => &rest[nl + 1..],
        // Single-line fence: skip an alphanumeric tag glued to the marker.
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "weekly_plan": { "monday": { "lunch": { "name": "Soup", "ingredients": [] } } },
            "daily_totals": {},
            "shopping_list": [],
            "notes": "braces } inside { strings"
        })
    }

    #[test]
    fn parses_plain_json() {
        let text = serde_json::to_string(&sample()).unwrap();
        assert_eq!(extract_json(&text).unwrap(), sample());
    }

    #[test]
    fn parses_pretty_json_with_surrounding_whitespace() {
        let text = format!("\n\n  {}  \n", serde_json::to_string_pretty(&sample()).unwrap());
        assert_eq!(extract_json(&text).unwrap(), sample());
    }

    #[test]
    fn fenced_input_extracts_like_unwrapped() {
        let inner = serde_json::to_string_pretty(&sample()).unwrap();
        for fenced in [
            format!("```json\n{inner}\n```"),
            format!("```\n{inner}\n```"),
            format!("```JSON\n{inner}```"),
            format!("```json{inner}```"),
        ] {
            assert_eq!(extract_json(&fenced).unwrap(), sample(), "input: {fenced}");
        }
    }

    #[test]
    fn falls_back_to_brace_span() {
        let text = format!(
            "Here is your meal plan:\n{}\nLet me know if you need changes!",
            serde_json::to_string(&sample()).unwrap()
        );
        assert_eq!(extract_json(&text).unwrap(), sample());
    }

    #[test]
    fn reports_span_error_when_span_is_malformed() {
        let err = extract_json("Sure! {\"weekly_plan\": {\"monday\": } } done").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidObject(_)), "got {err:?}");
    }

    #[test]
    fn reports_no_object_without_braces() {
        let err = extract_json("I cannot help with that.").unwrap_err();
        assert!(matches!(err, ExtractError::NoObject(_)), "got {err:?}");
    }

    #[test]
    fn reversed_braces_are_not_a_span() {
        let err = extract_json("} nothing here {").unwrap_err();
        assert!(matches!(err, ExtractError::NoObject(_)));
    }

    #[test]
    fn truncated_fenced_json_fails() {
        let err = extract_json("```json\n{\"weekly_plan\": {\"monday\": {\n```").unwrap_err();
        assert!(matches!(err, ExtractError::NoObject(_)), "got {err:?}");
    }

    #[test]
    fn strip_code_fence_leaves_unfenced_text() {
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }
}
