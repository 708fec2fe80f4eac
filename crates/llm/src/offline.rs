use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::LlmClient;
use crate::error::LlmError;

/// Network-free client for dry runs.
///
/// Answers every prompt with the most neutral value the schema allows:
/// `"neutral"` when an enum offers it, the minimum for numbers, `false`,
/// empty strings and empty arrays.
#[derive(Debug, Default, Clone)]
pub struct OfflineClient;

impl OfflineClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmClient for OfflineClient {
    fn name(&self) -> &str {
        "offline"
    }

    async fn classify(&self, _prompt: &str, schema: &Value) -> Result<Value, LlmError> {
        Ok(neutral_value(schema))
    }
}

fn neutral_value(schema: &Value) -> Value {
    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        return options
            .iter()
            .find(|o| o.as_str() == Some("neutral"))
            .or_else(|| options.first())
            .cloned()
            .unwrap_or(Value::Null);
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            let mut out = Map::new();
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (key, prop) in props {
                    out.insert(key.clone(), neutral_value(prop));
                }
            }
            Value::Object(out)
        }
        Some("array") => Value::Array(Vec::new()),
        Some("boolean") => Value::Bool(false),
        Some("number") | Some("integer") => schema
            .get("minimum")
            .cloned()
            .unwrap_or_else(|| Value::from(0)),
        Some("string") => Value::String(String::new()),
        _ => Value::Null,
    }
}
