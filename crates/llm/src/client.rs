use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::LlmError;
use crate::gemini::GeminiClient;
use crate::offline::OfflineClient;
use crate::openai::OpenAiClient;

/// The one seam between the pipeline and a language model.
///
/// Implementations send `prompt`, constrain the answer to JSON (using
/// `schema` where the provider supports it) and return the parsed value.
/// Validation against the schema is the caller's job.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Gemini,
    Offline,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::Offline => "offline",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            "offline" => Ok(Provider::Offline),
            other => Err(LlmError::Config(format!("unknown LLM provider: {other}"))),
        }
    }
}

/// Everything needed to construct a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: Provider,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override (proxies, compatible gateways).
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            model: crate::openai::DEFAULT_OPENAI_MODEL.to_string(),
            api_key: None,
            endpoint: None,
            timeout_secs: 60,
            temperature: 0.1,
            max_output_tokens: 2000,
        }
    }
}

/// Build the client selected by `settings.provider`.
///
/// Networked providers without an API key are a configuration error.
pub fn build_client(settings: &LlmSettings) -> Result<Arc<dyn LlmClient>, LlmError> {
    match settings.provider {
        Provider::OpenAi => Ok(Arc::new(OpenAiClient::from_settings(settings)?)),
        Provider::Gemini => Ok(Arc::new(GeminiClient::from_settings(settings)?)),
        Provider::Offline => Ok(Arc::new(OfflineClient::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" gemini ".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("claude-on-a-napkin".parse::<Provider>().is_err());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let settings = LlmSettings::default();
        let err = build_client(&settings).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_offline_needs_no_key() {
        let settings = LlmSettings {
            provider: Provider::Offline,
            ..LlmSettings::default()
        };
        let client = build_client(&settings).unwrap();
        assert_eq!(client.name(), "offline");
    }
}
