//! Text extraction from provider response envelopes.
//!
//! Providers wrap the generated text in different JSON shapes. Each shape
//! is tried in [`EnvelopeShape::PRIORITY`] order and the first one that
//! yields any text wins.

use serde_json::Value;

use super::types::ModelError;

/// Known response envelope layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `{"output_text": "..."}` or `{"output_text": ["...", "..."]}`
    OutputText,
    /// `{"output": [{"content": [{"text": "..."}]}]}`
    OutputItems,
    /// `{"choices": [{"message": {"content": "..."}}]}`
    ChatChoices,
}

impl EnvelopeShape {
    pub const PRIORITY: [EnvelopeShape; 3] = [
        EnvelopeShape::OutputText,
        EnvelopeShape::OutputItems,
        EnvelopeShape::ChatChoices,
    ];

    /// Text fragments found under this shape, in document order.
    ///
    /// Blank strings are dropped.
    pub fn fragments<'a>(&self, body: &'a Value) -> Vec<&'a str> {
        let mut out = Vec::new();
        match self {
            EnvelopeShape::OutputText => match body.get("output_text") {
                Some(Value::String(text)) => out.push(text.as_str()),
                Some(Value::Array(parts)) => out.extend(parts.iter().filter_map(Value::as_str)),
                _ => {}
            },
            EnvelopeShape::OutputItems => {
                let items = body.get("output").and_then(Value::as_array);
                for item in items.into_iter().flatten() {
                    let parts = item.get("content").and_then(Value::as_array);
                    for part in parts.into_iter().flatten() {
                        if let Some(text) = part.get("text").and_then(Value::as_str) {
                            out.push(text);
                        }
                    }
                }
            }
            EnvelopeShape::ChatChoices => {
                let choices = body.get("choices").and_then(Value::as_array);
                for choice in choices.into_iter().flatten() {
                    let content = choice
                        .get("message")
                        .and_then(|m| m.get("content"))
                        .and_then(Value::as_str);
                    if let Some(text) = content {
                        out.push(text);
                    }
                }
            }
        }
        out.retain(|s| !s.trim().is_empty());
        out
    }
}

/// Return the generated text from a provider response body.
///
/// Multiple fragments within the winning shape are joined with newlines.
pub fn extract_text(body: &Value) -> Result<String, ModelError> {
    for shape in EnvelopeShape::PRIORITY {
        let fragments = shape.fragments(body);
        if !fragments.is_empty() {
            return Ok(fragments.join("\n"));
        }
    }
    Err(ModelError::NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_text_is_preferred() {
        let body = json!({
            "output_text": "{\"a\":1}",
            "output": [{ "content": [{ "type": "output_text", "text": "ignored" }] }]
        });
        assert_eq!(extract_text(&body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn output_items_are_joined() {
        let body = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "{\"weekly_plan\":" },
                    { "type": "output_text", "text": "{}}" }
                ]}
            ]
        });
        assert_eq!(extract_text(&body).unwrap(), "{\"weekly_plan\":\n{}}");
    }

    #[test]
    fn empty_output_text_falls_through() {
        let body = json!({
            "output_text": "",
            "output": [{ "content": [{ "text": "fallback" }] }]
        });
        assert_eq!(extract_text(&body).unwrap(), "fallback");
    }

    #[test]
    fn output_text_array_is_joined() {
        let body = json!({ "output_text": ["{\"a\":", "1}"] });
        assert_eq!(extract_text(&body).unwrap(), "{\"a\":\n1}");
    }

    #[test]
    fn chat_choices_shape() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "hi" } }] });
        assert_eq!(extract_text(&body).unwrap(), "hi");
    }

    #[test]
    fn no_text_is_no_content() {
        assert_eq!(extract_text(&json!({ "output": [] })), Err(ModelError::NoContent));
        assert_eq!(extract_text(&json!({ "id": "resp_1" })), Err(ModelError::NoContent));
    }
}
