use filter::TopicProfile;
use serde_json::Value;

use crate::schema::Field;

pub const MAX_PROMPT_TEXT_CHARS: usize = 2000;

/// Build the sentiment prompt for one item. `context` is `post` or
/// `comment`; the item text is cut to [`MAX_PROMPT_TEXT_CHARS`].
pub fn build_sentiment_prompt(profile: &TopicProfile, schema: &Value, context: &str, text: &str) -> String {
    let fields: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
    let schema_json = serde_json::to_string_pretty(schema).unwrap_or_default();
    let company = &profile.company;
    let product = &profile.product;

    format!(
        r#"Analyze sentiment for this social media {context} about {company} (ad tech company).

Analyze these specific fields:
{fields}

Return JSON matching this exact schema:
{schema_json}

EXAMPLES:

Example 1 (Sarcasm):
TEXT: "Oh great, more {company} clickbait. Just wonderful how they clutter every website."
OUTPUT: {{
  "overall_sentiment": "negative",
  "field_sentiments": {{
    "product_quality": {{"sentiment": "negative", "confidence": 0.9, "key_phrases": ["clickbait"]}},
    "user_experience": {{"sentiment": "negative", "confidence": 0.95, "key_phrases": ["clutter every website"]}}
  }},
  "edge_cases": {{"is_sarcastic": true, "has_mixed_sentiment": false, "is_non_english": false, "language": "en", "is_spam": false}},
  "themes": [{{"theme": "ad_intrusiveness", "relevance": 0.9}}],
  "reasoning": "Sarcastic negative sentiment about ad quality and intrusiveness"
}}

Example 2 (Positive):
TEXT: "Implemented {company} {product} last quarter. Revenue up 40% and publishers love the dashboard."
OUTPUT: {{
  "overall_sentiment": "positive",
  "field_sentiments": {{
    "financial_performance": {{"sentiment": "positive", "confidence": 0.95, "key_phrases": ["revenue up 40%"]}},
    "publisher_relations": {{"sentiment": "positive", "confidence": 0.85, "key_phrases": ["publishers love"]}},
    "user_experience": {{"sentiment": "positive", "confidence": 0.8, "key_phrases": ["love the dashboard"]}}
  }},
  "edge_cases": {{"is_sarcastic": false, "has_mixed_sentiment": false, "is_non_english": false, "language": "en", "is_spam": false}},
  "themes": [{{"theme": "product_success", "relevance": 0.9}}],
  "reasoning": "Strong positive sentiment about financial results and publisher satisfaction"
}}

Now analyze this text:
TEXT: {text}

IMPORTANT:
- Only analyze fields relevant to the text (set confidence=0 if not mentioned)
- Detect sarcasm carefully like in Example 1
- Flag mixed sentiment if positive AND negative are both present
- Flag non-English text and give its language code
- Flag spam or bot-like promotional content
- Be concise but accurate"#,
        fields = fields.join(", "),
        text = truncate_chars(text, MAX_PROMPT_TEXT_CHARS),
    )
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::response_schema;

    #[test]
    fn test_prompt_names_fields_and_context() {
        let prompt = build_sentiment_prompt(&TopicProfile::default(), &response_schema(), "comment", "Ads everywhere");
        assert!(prompt.contains("social media comment about Taboola"));
        assert!(prompt.contains("product_quality, user_experience, business_practices"));
        assert!(prompt.contains("TEXT: Ads everywhere"));
        assert!(prompt.contains("\"maxItems\": 3"));
    }

    #[test]
    fn test_text_is_truncated() {
        let long = "é".repeat(2500);
        let prompt = build_sentiment_prompt(&TopicProfile::default(), &response_schema(), "post", &long);
        assert!(prompt.contains(&"é".repeat(2000)));
        assert!(!prompt.contains(&"é".repeat(2001)));
    }
}
