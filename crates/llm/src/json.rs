use serde_json::Value;

use crate::error::{LlmError, make_snippet};

/// Parse model output as JSON.
///
/// Models in JSON mode occasionally wrap the object in code fences or a
/// sentence of chatter; when the strict parse fails the outermost `{...}`
/// span is tried before giving up.
pub fn parse_llm_json(raw: &str) -> Result<Value, LlmError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(LlmError::MalformedJson(make_snippet(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let value = parse_llm_json(r#"{"overall_sentiment": "positive"}"#).unwrap();
        assert_eq!(value["overall_sentiment"], "positive");
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"is_relevant\": true}\n```";
        let value = parse_llm_json(raw).unwrap();
        assert_eq!(value["is_relevant"], true);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_llm_json("definitely not json"),
            Err(LlmError::MalformedJson(_))
        ));
        assert!(matches!(parse_llm_json("   "), Err(LlmError::EmptyResponse)));
    }
}
