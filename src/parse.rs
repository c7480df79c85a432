//! Turning a provider's raw text into a JSON object.
//!
//! Strict providers are trusted to return bare JSON. Free-text providers
//! often wrap it in prose or Markdown fences, so their output goes through
//! extraction first.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::transport::Conformance;

/// Why a response could not be turned into a JSON object. The message is fed
/// back to the provider in the repair prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure(pub String);

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn parse_response(text: &str, conformance: Conformance) -> Result<Value, ParseFailure> {
    let candidate = match conformance {
        Conformance::Strict => text.trim(),
        Conformance::FreeText => extract_json_object(text).unwrap_or(text.trim()),
    };
    if candidate.is_empty() {
        return Err(ParseFailure("response was empty".into()));
    }
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ParseFailure("response was JSON but not an object".into())),
        Err(e) => Err(ParseFailure(format!("response was not valid JSON: {e}"))),
    }
}

fn fence_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").ok())
        .as_ref()
}

/// Locate the JSON object inside free text: a fenced ```json block if there
/// is one, otherwise the span from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let fenced = fence_pattern()
        .and_then(|fence| fence.captures(text))
        .and_then(|c| c.get(1));
    if let Some(found) = fenced {
        return Some(found.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_accepts_bare_object() {
        let value = parse_response(" {\"a\": 1}\n", Conformance::Strict).unwrap();
        assert_eq!(value, json!({ "a": 1 }));
    }

    #[test]
    fn strict_does_not_dig_through_prose() {
        let err = parse_response("Here you go: {\"a\": 1}", Conformance::Strict).unwrap_err();
        assert!(err.0.contains("not valid JSON"));
    }

    #[test]
    fn free_text_extracts_fenced_block() {
        let text = "Sure! Here is the deck:\n```json\n{\"title\": \"T\"}\n```\nLet me know.";
        assert_eq!(
            parse_response(text, Conformance::FreeText).unwrap(),
            json!({ "title": "T" })
        );
    }

    #[test]
    fn free_text_falls_back_to_brace_span() {
        let text = "Result: {\"title\": \"T\", \"nested\": {\"x\": 1}} -- end";
        assert_eq!(
            parse_response(text, Conformance::FreeText).unwrap(),
            json!({ "title": "T", "nested": { "x": 1 } })
        );
    }

    #[test]
    fn fence_pattern_is_compiled_once() {
        let first = fence_pattern().expect("fence pattern compiles");
        let second = fence_pattern().expect("fence pattern compiles");
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn truncated_json_fails() {
        assert!(parse_response("{ slides: [...", Conformance::FreeText).is_err());
        assert!(parse_response("{ \"slides\": [1,2,], }", Conformance::Strict).is_err());
    }

    #[test]
    fn non_object_json_fails() {
        let err = parse_response("[1, 2]", Conformance::Strict).unwrap_err();
        assert!(err.0.contains("not an object"));
        assert!(parse_response("   ", Conformance::Strict).is_err());
    }
}
