use llm::{RetryPolicy, Transient};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("invalid response body from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            FetchError::Timeout { .. } | FetchError::Transport { .. } => true,
            FetchError::Decode { .. } | FetchError::Client(_) => false,
        }
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else if let Some(status) = e.status() {
        FetchError::Status { status: status.as_u16(), url: url.to_string() }
    } else {
        FetchError::Transport { url: url.to_string(), message: e.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    /// Pause after every request, successful or not.
    pub request_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: "social-pulse/0.1".to_string(),
            timeout: Duration::from_secs(20),
            request_delay: Duration::from_secs(1),
            retry: RetryPolicy::new(3, 2000, 30000),
        }
    }
}

/// Polite GET client shared by the platform sources.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    request_delay: Duration,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(settings: HttpSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            request_delay: settings.request_delay,
            retry: settings.retry,
        })
    }

    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let body = self.get_text(url, query).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        self.retry
            .retry(url, || async {
                let result = self.send_once(url, query).await;
                if !self.request_delay.is_zero() {
                    sleep(self.request_delay).await;
                }
                result
            })
            .await
    }

    async fn send_once(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        debug!(url, params = query.len(), "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status: status.as_u16(), url: url.to_string() });
        }

        response.text().await.map_err(|e| classify(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let status = |s| FetchError::Status { status: s, url: "u".into() };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(FetchError::Timeout { url: "u".into() }.is_transient());
        assert!(!FetchError::Decode { url: "u".into(), message: "m".into() }.is_transient());
    }

    #[test]
    fn test_builds_with_defaults() {
        assert!(HttpFetcher::new(HttpSettings::default()).is_ok());
    }
}
