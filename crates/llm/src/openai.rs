use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::client::{LlmClient, LlmSettings};
use crate::error::{LlmError, make_snippet};
use crate::json::parse_llm_json;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const SYSTEM_MESSAGE: &str =
    "You are a precise classifier. Respond ONLY with a JSON object matching the schema in the user message.";

#[derive(Clone)]
pub struct OpenAiClient {
    url_chat: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Value,
}

impl OpenAiClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: String,
        timeout: Duration,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, LlmError> {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(LlmError::Config(format!("invalid OpenAI endpoint: {endpoint}")));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| LlmError::Config(format!("invalid API key header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            url_chat: format!("{}/v1/chat/completions", endpoint.trim_end_matches('/')),
            model,
            temperature,
            max_tokens,
            client,
        })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey("openai"))?;

        Self::new(
            settings.endpoint.as_deref().unwrap_or(DEFAULT_OPENAI_ENDPOINT),
            api_key,
            settings.model.clone(),
            Duration::from_secs(settings.timeout_secs),
            settings.temperature,
            settings.max_output_tokens,
        )
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, prompt: &str, _schema: &Value) -> Result<Value, LlmError> {
        let started = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_MESSAGE },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "POST {}", self.url_chat);

        let response = self.client.post(&self.url_chat).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let snippet = make_snippet(&response.text().await.unwrap_or_default());
            warn!(
                status,
                %snippet,
                model = %self.model,
                latency_ms = started.elapsed().as_millis() as u64,
                "OpenAI chat completion returned non-success status"
            );
            return Err(LlmError::Status { status, snippet });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedJson(format!("chat completion envelope: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| extract_content(&c.message.content))
            .ok_or(LlmError::EmptyResponse)?;

        debug!(
            model = %self.model,
            latency_ms = started.elapsed().as_millis() as u64,
            "chat completion completed"
        );

        parse_llm_json(&content)
    }
}

/// `content` is usually a string, but some models return a list of parts.
fn extract_content(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let joined: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if joined.is_empty() { None } else { Some(joined) }
        }
        Value::Object(_) => Some(content.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_string_content() {
        assert_eq!(extract_content(&json!("{\"a\":1}")).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_extract_part_list_content() {
        let parts = json!([{"type": "text", "text": "{\"a\":"}, {"type": "text", "text": "1}"}]);
        assert_eq!(extract_content(&parts).as_deref(), Some("{\"a\":1}"));
        assert_eq!(extract_content(&Value::Null), None);
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let result = OpenAiClient::new(
            "api.openai.com",
            "key",
            DEFAULT_OPENAI_MODEL.to_string(),
            Duration::from_secs(5),
            0.1,
            100,
        );
        assert!(matches!(result, Err(LlmError::Config(_))));
    }
}
