use ingest::ItemMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

impl Sentiment {
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Neutral,
        Sentiment::Negative,
        Sentiment::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business dimensions every item is scored on. Declaration order is the
/// order used in prompts and output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProductQuality,
    UserExperience,
    BusinessPractices,
    FinancialPerformance,
    PublisherRelations,
    AdvertiserValue,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::ProductQuality,
        Field::UserExperience,
        Field::BusinessPractices,
        Field::FinancialPerformance,
        Field::PublisherRelations,
        Field::AdvertiserValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ProductQuality => "product_quality",
            Field::UserExperience => "user_experience",
            Field::BusinessPractices => "business_practices",
            Field::FinancialPerformance => "financial_performance",
            Field::PublisherRelations => "publisher_relations",
            Field::AdvertiserValue => "advertiser_value",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSentiment {
    pub sentiment: Sentiment,
    pub confidence: f64,
    #[serde(default)]
    pub key_phrases: Vec<String>,
}

impl FieldSentiment {
    /// The value for a field the text does not mention.
    pub fn unmentioned() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: 0.0,
            key_phrases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCases {
    #[serde(default)]
    pub is_sarcastic: bool,
    #[serde(default)]
    pub has_mixed_sentiment: bool,
    #[serde(default)]
    pub is_non_english: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub is_spam: bool,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for EdgeCases {
    fn default() -> Self {
        Self {
            is_sarcastic: false,
            has_mixed_sentiment: false,
            is_non_english: false,
            language: default_language(),
            is_spam: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub theme: String,
    pub relevance: f64,
}

/// A validated model answer. Always holds all six fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub overall_sentiment: Sentiment,
    pub field_sentiments: BTreeMap<Field, FieldSentiment>,
    pub edge_cases: EdgeCases,
    pub themes: Vec<Theme>,
    pub reasoning: String,
}

impl Analysis {
    /// Result for empty text, produced without calling the model.
    pub fn empty() -> Self {
        Self {
            overall_sentiment: Sentiment::Neutral,
            field_sentiments: Field::ALL
                .into_iter()
                .map(|f| (f, FieldSentiment::unmentioned()))
                .collect(),
            edge_cases: EdgeCases {
                language: "unknown".to_string(),
                ..Default::default()
            },
            themes: Vec::new(),
            reasoning: "Empty or invalid text".to_string(),
        }
    }

    pub fn field(&self, field: Field) -> Option<&FieldSentiment> {
        self.field_sentiments.get(&field)
    }
}

/// One analyzed item, as written to `sentiment_results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub text: String,
    pub context: String,
    pub metadata: ItemMetadata,
    pub analysis: Analysis,
}

/// JSON schema embedded in the prompt and passed to providers that accept
/// one.
pub fn response_schema() -> Value {
    let sentiments: Vec<&str> = Sentiment::ALL.iter().map(|s| s.as_str()).collect();

    let mut fields = Map::new();
    for field in Field::ALL {
        fields.insert(
            field.as_str().to_string(),
            json!({
                "type": "object",
                "properties": {
                    "sentiment": {"type": "string", "enum": sentiments},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1},
                    "key_phrases": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["sentiment", "confidence"]
            }),
        );
    }

    json!({
        "type": "object",
        "properties": {
            "overall_sentiment": {"type": "string", "enum": sentiments},
            "field_sentiments": {"type": "object", "properties": fields},
            "edge_cases": {
                "type": "object",
                "properties": {
                    "is_sarcastic": {"type": "boolean"},
                    "has_mixed_sentiment": {"type": "boolean"},
                    "is_non_english": {"type": "boolean"},
                    "language": {"type": "string"},
                    "is_spam": {"type": "boolean"}
                }
            },
            "themes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "theme": {"type": "string"},
                        "relevance": {"type": "number", "minimum": 0, "maximum": 1}
                    }
                },
                "maxItems": 3
            },
            "reasoning": {"type": "string"}
        },
        "required": ["overall_sentiment", "field_sentiments", "edge_cases", "themes"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_keys_serialize_snake_case() {
        let json = serde_json::to_value(Analysis::empty()).unwrap();
        let keys: Vec<_> = json["field_sentiments"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&"publisher_relations".to_string()));
        assert_eq!(json["overall_sentiment"], "neutral");
        assert_eq!(json["edge_cases"]["language"], "unknown");
    }

    #[test]
    fn test_schema_lists_every_field() {
        let schema = response_schema();
        let props = schema["properties"]["field_sentiments"]["properties"].as_object().unwrap();
        for field in Field::ALL {
            assert!(props.contains_key(field.as_str()));
        }
        assert_eq!(schema["properties"]["overall_sentiment"]["enum"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_round_trips_names() {
        assert_eq!(Field::parse("advertiser_value"), Some(Field::AdvertiserValue));
        assert_eq!(Sentiment::parse("mixed"), Some(Sentiment::Mixed));
        assert_eq!(Sentiment::parse("Mixed"), None);
    }
}
