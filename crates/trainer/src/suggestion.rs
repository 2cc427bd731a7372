//! Best-effort parsing of the opponent's free-text reply.
//!
//! The collaborator is asked for a JSON object but may wrap it in prose,
//! omit fields or send the wrong types. Parsing never fails: anything
//! missing degrades to a default, and a missing move leaves `notation`
//! empty with zero confidence.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

pub const DEFAULT_THINKING: &str = "Thinking deeply about the position...";
pub const DEFAULT_EVALUATION: &str = "Unknown";

/// Longest notation worth handing to the decoder (`Nbxd2+` style tokens are shorter).
const MAX_NOTATION_LEN: usize = 10;

static JSON_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json span regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Short algebraic notation, not yet resolved against the board.
    pub notation: Option<String>,
    pub thinking: String,
    pub evaluation: String,
    /// 0-100
    pub confidence: u8,
}

impl Suggestion {
    /// A suggestion carrying only an explanation of what went wrong.
    pub fn failed(thinking: impl Into<String>) -> Self {
        Self {
            notation: None,
            thinking: thinking.into(),
            evaluation: "Error".to_string(),
            confidence: 0,
        }
    }
}

/// Extract a suggestion from raw completion text.
pub fn parse_suggestion(raw: &str) -> Suggestion {
    let Some(span) = JSON_SPAN_RE.find(raw) else {
        tracing::warn!("Suggestion has no JSON object");
        return Suggestion::failed("The reply did not contain a move.");
    };

    let value: Value = match serde_json::from_str(span.as_str()) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Failed to parse suggestion JSON: {e}");
            return Suggestion::failed("The reply could not be read.");
        }
    };

    let notation = value
        .get("move")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty() && m.len() <= MAX_NOTATION_LEN && !m.contains(char::is_whitespace))
        .map(String::from);

    let thinking = value
        .get("thinking")
        .and_then(|v| v.as_str())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(DEFAULT_THINKING)
        .to_string();

    let evaluation = value
        .get("evaluation")
        .and_then(|v| v.as_str())
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(DEFAULT_EVALUATION)
        .to_string();

    let confidence = if notation.is_some() {
        value.get("confidence").and_then(read_confidence).unwrap_or(0)
    } else {
        0
    };

    Suggestion {
        notation,
        thinking,
        evaluation,
        confidence,
    }
}

/// A number or numeric string, clamped to 0-100.
fn read_confidence(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() {
        Some(n.round().clamp(0.0, 100.0) as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_json() {
        let raw = r#"{"move": "Nf3", "thinking": "Develop.", "evaluation": "Equal", "confidence": 85}"#;
        let s = parse_suggestion(raw);
        assert_eq!(s.notation.as_deref(), Some("Nf3"));
        assert_eq!(s.thinking, "Develop.");
        assert_eq!(s.evaluation, "Equal");
        assert_eq!(s.confidence, 85);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let raw = "Sure! Here is my move:\n```json\n{\n  \"move\": \"e5\",\n  \"confidence\": \"70%\"\n}\n```\nGood luck.";
        let s = parse_suggestion(raw);
        assert_eq!(s.notation.as_deref(), Some("e5"));
        assert_eq!(s.thinking, DEFAULT_THINKING);
        assert_eq!(s.evaluation, DEFAULT_EVALUATION);
        assert_eq!(s.confidence, 70);
    }

    #[test]
    fn test_missing_move_has_zero_confidence() {
        let s = parse_suggestion(r#"{"thinking": "Hmm", "confidence": 99}"#);
        assert_eq!(s.notation, None);
        assert_eq!(s.confidence, 0);
        assert_eq!(s.thinking, "Hmm");
    }

    #[test]
    fn test_garbage_degrades() {
        for raw in ["", "no json here", "{not json}", r#"{"move": 42}"#, r#"{"move": "I play e4"}"#] {
            let s = parse_suggestion(raw);
            assert_eq!(s.notation, None, "{raw}");
            assert_eq!(s.confidence, 0, "{raw}");
        }
    }

    #[test]
    fn test_confidence_is_clamped() {
        let s = parse_suggestion(r#"{"move": "d4", "confidence": 250}"#);
        assert_eq!(s.confidence, 100);
        let s = parse_suggestion(r#"{"move": "d4", "confidence": -3}"#);
        assert_eq!(s.confidence, 0);
        let s = parse_suggestion(r#"{"move": "d4", "confidence": [1]}"#);
        assert_eq!(s.confidence, 0);
    }
}
