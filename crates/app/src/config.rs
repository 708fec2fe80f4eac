use aggregate::ThemeConfig;
use filter::{FilterConfig, TopicProfile};
use ingest::{HackerNewsSettings, HttpSettings};
use llm::{LlmSettings, Provider, RetryPolicy};
use sentiment::{AnalyzerConfig, PoolConfig, RepairPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{provider} API key not provided; set {var} or pass --api-key")]
    MissingApiKey { provider: Provider, var: &'static str },

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("{0}")]
    Constraint(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub concurrency: PoolConfig,
    pub retry: RetryConfig,
    pub filter: FilterConfig,
    pub analysis: AnalysisConfig,
    pub ingest: IngestConfig,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub repair_policy: RepairPolicy,
    pub themes: ThemeConfig,
    /// Stop submitting new items after this many seconds.
    pub run_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub reddit_user_agent: String,
    pub hn_user_agent: String,
    pub hn_max_comments_per_story: usize,
    pub hn_max_comment_depth: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            concurrency: PoolConfig::default(),
            retry: RetryConfig {
                max_attempts: 3,
                initial_backoff_ms: 2000,
                max_backoff_ms: 30000,
            },
            filter: FilterConfig::default(),
            analysis: AnalysisConfig {
                repair_policy: RepairPolicy::Repair,
                themes: ThemeConfig::default(),
                run_timeout_secs: None,
            },
            ingest: IngestConfig {
                reddit_user_agent: "social-pulse/0.1 (social listening)".to_string(),
                hn_user_agent: "social-pulse/0.1 (social listening)".to_string(),
                hn_max_comments_per_story: 10,
                hn_max_comment_depth: 0,
            },
            output_dir: PathBuf::from("output"),
        }
    }
}

fn parse<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
    })
}

fn seconds_to_ms(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let secs: f64 = parse(var, raw)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::Invalid { var, value: raw.to_string() });
    }
    Ok((secs * 1000.0).round() as u64)
}

impl AppConfig {
    /// Load from the process environment. `.env` is read by the caller
    /// first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_provider(None)
    }

    /// As [`AppConfig::from_env`], with `provider` taking precedence over
    /// `LLM_PROVIDER` so its key and model variables are the ones read.
    pub fn from_env_with_provider(provider: Option<Provider>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match (key, provider) {
            ("LLM_PROVIDER", Some(p)) => Some(p.to_string()),
            _ => std::env::var(key).ok().filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("LLM_PROVIDER") {
            config.llm.provider = Provider::from_str(&raw).map_err(|_| ConfigError::UnknownProvider(raw.clone()))?;
        }
        match config.llm.provider {
            Provider::OpenAi => {
                config.llm.api_key = lookup("OPENAI_API_KEY");
                config.llm.model = lookup("OPENAI_MODEL").unwrap_or_else(|| llm::openai::DEFAULT_OPENAI_MODEL.to_string());
                config.llm.endpoint = lookup("OPENAI_BASE_URL");
            }
            Provider::Gemini => {
                config.llm.api_key = lookup("GEMINI_API_KEY");
                config.llm.model = lookup("GEMINI_MODEL").unwrap_or_else(|| llm::gemini::DEFAULT_GEMINI_MODEL.to_string());
            }
            Provider::Offline => {
                config.llm.model = "offline".to_string();
            }
        }
        if let Some(raw) = lookup("LLM_TIMEOUT") {
            config.llm.timeout_secs = parse("LLM_TIMEOUT", &raw)?;
        }

        if let Some(raw) = lookup("LLM_MAX_WORKERS") {
            config.concurrency.max_workers = parse("LLM_MAX_WORKERS", &raw)?;
        }
        if let Some(raw) = lookup("LLM_REQUEST_DELAY") {
            config.concurrency.request_delay_ms = seconds_to_ms("LLM_REQUEST_DELAY", &raw)?;
        }
        if let Some(raw) = lookup("LLM_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse("LLM_MAX_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("RUN_TIMEOUT") {
            config.analysis.run_timeout_secs = Some(parse("RUN_TIMEOUT", &raw)?);
        }

        if let Some(company) = lookup("TARGET_COMPANY") {
            config.filter.profile.company = company;
        }
        if let Some(product) = lookup("TARGET_PRODUCT") {
            config.filter.profile.product = product;
        }

        if let Some(agent) = lookup("REDDIT_USER_AGENT") {
            config.ingest.reddit_user_agent = agent;
        }
        if let Some(agent) = lookup("HN_USER_AGENT") {
            config.ingest.hn_user_agent = agent;
        }
        if let Some(raw) = lookup("HN_MAX_COMMENTS_PER_STORY") {
            config.ingest.hn_max_comments_per_story = parse("HN_MAX_COMMENTS_PER_STORY", &raw)?;
        }
        if let Some(raw) = lookup("HN_MAX_COMMENT_DEPTH") {
            config.ingest.hn_max_comment_depth = parse("HN_MAX_COMMENT_DEPTH", &raw)?;
        }

        Ok(config)
    }

    /// Swap in the network-free client.
    pub fn use_offline(&mut self) {
        self.llm.provider = Provider::Offline;
        self.llm.model = "offline".to_string();
        self.llm.api_key = None;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let key_var = match self.llm.provider {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Offline => None,
        };
        if let Some(var) = key_var {
            if self.llm.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                return Err(ConfigError::MissingApiKey { provider: self.llm.provider, var });
            }
        }
        if self.concurrency.max_workers == 0 {
            return Err(ConfigError::Constraint("LLM_MAX_WORKERS must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Constraint("LLM_MAX_ATTEMPTS must be at least 1".into()));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Constraint("initial backoff exceeds max backoff".into()));
        }
        if self.filter.profile.company.trim().is_empty() {
            return Err(ConfigError::Constraint("TARGET_COMPANY must not be empty".into()));
        }
        Ok(())
    }

    pub fn profile(&self) -> TopicProfile {
        self.filter.profile.clone()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts, self.retry.initial_backoff_ms, self.retry.max_backoff_ms)
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            max_attempts: self.retry.max_attempts,
            initial_backoff_ms: self.retry.initial_backoff_ms,
            max_backoff_ms: self.retry.max_backoff_ms,
            repair_policy: self.analysis.repair_policy,
        }
    }

    pub fn http_settings(&self, user_agent: &str) -> HttpSettings {
        HttpSettings {
            user_agent: user_agent.to_string(),
            ..HttpSettings::default()
        }
    }

    pub fn hacker_news_settings(&self) -> HackerNewsSettings {
        HackerNewsSettings {
            max_comments_per_story: self.ingest.hn_max_comments_per_story,
            max_comment_depth: self.ingest.hn_max_comment_depth,
        }
    }
}
