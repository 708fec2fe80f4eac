use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::client::{LlmClient, LlmSettings};
use crate::error::{LlmError, make_snippet};
use crate::json::parse_llm_json;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Clone)]
pub struct GeminiClient {
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_output_tokens: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: &'a Value,
}

impl GeminiClient {
    pub fn new(
        endpoint: &str,
        api_key: String,
        model: String,
        timeout: Duration,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            model,
            api_key,
            temperature,
            max_output_tokens,
            client,
        })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey("gemini"))?;

        Self::new(
            settings.endpoint.as_deref().unwrap_or(DEFAULT_GEMINI_ENDPOINT),
            api_key,
            settings.model.clone(),
            Duration::from_secs(settings.timeout_secs),
            settings.temperature,
            settings.max_output_tokens,
        )
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request<'a>(&self, prompt: &'a str, schema: &'a Value) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: "application/json",
                response_schema: schema,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn classify(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError> {
        let started = Instant::now();
        let url = self.url();
        let request = self.request(prompt, schema);

        debug!(model = %self.model, prompt_len = prompt.len(), "POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let snippet = make_snippet(&response.text().await.unwrap_or_default());
            warn!(
                status,
                %snippet,
                model = %self.model,
                latency_ms = started.elapsed().as_millis() as u64,
                "Gemini generateContent returned non-success status"
            );
            return Err(LlmError::Status { status, snippet });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedJson(format!("generateContent envelope: {e}")))?;

        match extract_payload(&body) {
            Some(Value::String(text)) => parse_llm_json(&text),
            Some(value) => Ok(value),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

/// Pull the model's answer out of a `generateContent` envelope.
///
/// The answer sits in `candidates[0].content.parts[0]` as `text`, `json`
/// or `functionCall.args` depending on the model and request mode.
fn extract_payload(body: &Value) -> Option<Value> {
    let candidate = body.get("candidates")?.as_array()?.first()?;

    let parts = match candidate.get("content") {
        Some(Value::Object(content)) => content.get("parts").and_then(Value::as_array),
        Some(Value::Array(parts)) => Some(parts),
        _ => None,
    };

    if let Some(first) = parts.and_then(|p| p.first()) {
        if let Some(text) = first.get("text").and_then(Value::as_str) {
            return Some(Value::String(text.to_string()));
        }
        if let Some(json) = first.get("json") {
            return Some(json.clone());
        }
        if let Some(args) = first.get("functionCall").and_then(|f| f.get("args")) {
            return Some(args.clone());
        }
    }

    candidate
        .get("text")
        .and_then(Value::as_str)
        .map(|t| Value::String(t.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_text_part() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "{\"overall_sentiment\":\"negative\"}"}]}}]
        });
        let payload = extract_payload(&body).unwrap();
        assert_eq!(payload, Value::String("{\"overall_sentiment\":\"negative\"}".into()));
    }

    #[test]
    fn test_extracts_function_call_args() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"functionCall": {"args": {"is_relevant": true}}}]}}]
        });
        assert_eq!(extract_payload(&body).unwrap()["is_relevant"], true);
    }

    #[test]
    fn test_request_carries_response_schema() {
        let client = GeminiClient::new(
            "https://example.invalid/",
            "key".into(),
            DEFAULT_GEMINI_MODEL.into(),
            Duration::from_secs(5),
            0.1,
            1024,
        )
        .unwrap();
        let schema = json!({"type": "object", "required": ["overall_sentiment"]});
        let body = serde_json::to_value(client.request("classify this", &schema)).unwrap();

        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"], schema);
        assert_eq!(config["maxOutputTokens"], 1024);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "classify this");
        assert_eq!(
            client.url(),
            "https://example.invalid/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_empty_candidates() {
        assert!(extract_payload(&json!({"candidates": []})).is_none());
        assert!(extract_payload(&json!({})).is_none());
    }
}
