use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::schema::{Analysis, EdgeCases, Field, FieldSentiment, Sentiment, Theme};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPolicy {
    /// Fill in defaults and clamp values, recording each fix.
    #[default]
    Repair,
    /// Any needed fix rejects the answer.
    Strict,
}

#[derive(Debug, Error, PartialEq)]
pub enum RepairError {
    #[error("model answer is not a JSON object")]
    NotAnObject,

    #[error("model answer needed {} fix(es): {}", .0.len(), .0.join("; "))]
    Rejected(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub analysis: Analysis,
    pub fixes: Vec<String>,
}

impl Repaired {
    pub fn was_repaired(&self) -> bool {
        !self.fixes.is_empty()
    }
}

/// Turn a raw model answer into a schema-valid [`Analysis`].
pub fn validate_and_repair(value: &Value, policy: RepairPolicy) -> Result<Repaired, RepairError> {
    let mut fixes = Vec::new();

    let object = match value {
        Value::Object(map) => map,
        Value::Array(items) => {
            let first = items.iter().find_map(Value::as_object).ok_or(RepairError::NotAnObject)?;
            fixes.push("answer was an array; used its first object".to_string());
            first
        }
        _ => return Err(RepairError::NotAnObject),
    };

    let overall_sentiment = match object.get("overall_sentiment").and_then(Value::as_str).and_then(Sentiment::parse) {
        Some(s) => s,
        None => {
            fixes.push("overall_sentiment invalid or missing; set to neutral".to_string());
            Sentiment::Neutral
        }
    };

    let field_sentiments = repair_fields(object.get("field_sentiments"), &mut fixes);
    let edge_cases = repair_edge_cases(object.get("edge_cases"), &mut fixes);
    let themes = repair_themes(object.get("themes"), &mut fixes);

    let reasoning = match object.get("reasoning").and_then(Value::as_str) {
        Some(r) => r.to_string(),
        None => {
            fixes.push("reasoning missing".to_string());
            "Analysis completed".to_string()
        }
    };

    if policy == RepairPolicy::Strict && !fixes.is_empty() {
        return Err(RepairError::Rejected(fixes));
    }

    Ok(Repaired {
        analysis: Analysis {
            overall_sentiment,
            field_sentiments,
            edge_cases,
            themes,
            reasoning,
        },
        fixes,
    })
}

fn repair_fields(raw: Option<&Value>, fixes: &mut Vec<String>) -> BTreeMap<Field, FieldSentiment> {
    let mut keyed: Vec<(String, &Value)> = Vec::new();

    match raw {
        Some(Value::Object(map)) => {
            keyed.extend(map.iter().map(|(k, v)| (k.clone(), v)));
        }
        Some(Value::Array(list)) => {
            fixes.push("field_sentiments was a list".to_string());
            for entry in list {
                if let Some(name) = entry.get("field").and_then(Value::as_str) {
                    keyed.push((name.to_string(), entry));
                }
            }
            if keyed.is_empty() {
                for (field, entry) in Field::ALL.iter().zip(list) {
                    if entry.is_object() {
                        keyed.push((field.as_str().to_string(), entry));
                    }
                }
            }
        }
        _ => fixes.push("field_sentiments missing".to_string()),
    }

    let mut fields = BTreeMap::new();
    for (name, entry) in keyed {
        let Some(field) = Field::parse(&name) else {
            fixes.push(format!("dropped unknown field {name}"));
            continue;
        };
        match entry.as_object() {
            Some(obj) => {
                fields.insert(field, repair_field(field, obj, fixes));
            }
            None => fixes.push(format!("{field} was not an object")),
        }
    }

    for field in Field::ALL {
        if !fields.contains_key(&field) {
            fixes.push(format!("{field} missing; filled as unmentioned"));
            fields.insert(field, FieldSentiment::unmentioned());
        }
    }
    fields
}

fn repair_field(field: Field, obj: &Map<String, Value>, fixes: &mut Vec<String>) -> FieldSentiment {
    let sentiment = match obj.get("sentiment").and_then(Value::as_str).and_then(Sentiment::parse) {
        Some(s) => s,
        None => {
            fixes.push(format!("{field}.sentiment invalid; set to neutral"));
            Sentiment::Neutral
        }
    };

    let confidence = match obj.get("confidence").and_then(Value::as_f64) {
        Some(c) if (0.0..=1.0).contains(&c) => c,
        Some(c) if c.is_finite() => {
            fixes.push(format!("{field}.confidence {c} clamped"));
            c.clamp(0.0, 1.0)
        }
        _ => {
            fixes.push(format!("{field}.confidence missing or non-numeric; set to 0"));
            0.0
        }
    };

    let key_phrases = match obj.get("key_phrases") {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Some(_) => {
            fixes.push(format!("{field}.key_phrases was not a list"));
            Vec::new()
        }
    };

    FieldSentiment { sentiment, confidence, key_phrases }
}

fn repair_edge_cases(raw: Option<&Value>, fixes: &mut Vec<String>) -> EdgeCases {
    let Some(obj) = raw.and_then(Value::as_object) else {
        fixes.push("edge_cases missing; defaults used".to_string());
        return EdgeCases::default();
    };
    let flag = |key: &str| obj.get(key).and_then(Value::as_bool).unwrap_or(false);
    EdgeCases {
        is_sarcastic: flag("is_sarcastic"),
        has_mixed_sentiment: flag("has_mixed_sentiment"),
        is_non_english: flag("is_non_english"),
        language: obj
            .get("language")
            .and_then(Value::as_str)
            .filter(|l| !l.trim().is_empty())
            .unwrap_or("en")
            .to_string(),
        is_spam: flag("is_spam"),
    }
}

fn repair_themes(raw: Option<&Value>, fixes: &mut Vec<String>) -> Vec<Theme> {
    let Some(list) = raw.and_then(Value::as_array) else {
        fixes.push("themes not a list; emptied".to_string());
        return Vec::new();
    };

    let mut themes = Vec::with_capacity(list.len());
    for entry in list {
        let Some(name) = entry.get("theme").and_then(Value::as_str).filter(|t| !t.trim().is_empty()) else {
            fixes.push("dropped theme without a name".to_string());
            continue;
        };
        let relevance = match entry.get("relevance").and_then(Value::as_f64) {
            Some(r) if (0.0..=1.0).contains(&r) => r,
            Some(r) if r.is_finite() => {
                fixes.push(format!("theme {name} relevance clamped"));
                r.clamp(0.0, 1.0)
            }
            _ => {
                fixes.push(format!("theme {name} relevance missing; set to 0"));
                0.0
            }
        };
        themes.push(Theme { theme: name.to_string(), relevance });
    }
    themes
}
