use thiserror::Error;

use crate::retry::Transient;

/// Errors surfaced by any [`crate::LlmClient`] implementation.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Non-2xx response from the provider.
    #[error("provider returned status {status}: {snippet}")]
    Status { status: u16, snippet: String },

    /// Connection reset, DNS failure, body read error, ...
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    /// The model answered, but not with parseable JSON.
    #[error("malformed JSON from model: {0}")]
    MalformedJson(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("missing API key for provider {0}")]
    MissingApiKey(&'static str),

    #[error("config error: {0}")]
    Config(String),
}

impl LlmError {
    /// Rate limits, server errors, timeouts, transport hiccups and garbled
    /// JSON are worth another attempt. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            LlmError::Transport(_) | LlmError::Timeout | LlmError::MalformedJson(_) => true,
            LlmError::EmptyResponse => true,
            LlmError::MissingApiKey(_) | LlmError::Config(_) => false,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, LlmError::MissingApiKey(_) | LlmError::Config(_))
    }
}

impl Transient for LlmError {
    fn is_transient(&self) -> bool {
        LlmError::is_transient(self)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else if let Some(status) = e.status() {
            LlmError::Status {
                status: status.as_u16(),
                snippet: e.to_string(),
            }
        } else {
            LlmError::Transport(e.to_string())
        }
    }
}

/// First 200 characters of a response body, for log lines and errors.
pub fn make_snippet(text: &str) -> String {
    const MAX: usize = 200;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let rate_limited = LlmError::Status { status: 429, snippet: String::new() };
        let overloaded = LlmError::Status { status: 503, snippet: String::new() };
        let bad_request = LlmError::Status { status: 400, snippet: String::new() };

        assert!(rate_limited.is_transient());
        assert!(overloaded.is_transient());
        assert!(!bad_request.is_transient());
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::MalformedJson("x".into()).is_transient());
        assert!(!LlmError::MissingApiKey("openai").is_transient());
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let snippet = make_snippet(&long);
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 203);
    }
}
