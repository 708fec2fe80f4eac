use filter::{FilteredItem, TopicProfile};
use llm::{LlmClient, LlmError, RetryPolicy, Transient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics::{AnalysisMetrics, TimedOperation};
use crate::prompt::build_sentiment_prompt;
use crate::repair::{RepairError, RepairPolicy, validate_and_repair};
use crate::schema::{Analysis, SentimentResult, response_schema};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("unusable model answer: {0}")]
    Malformed(#[from] RepairError),
}

impl Transient for AnalysisError {
    /// An answer repair could not fix is worth asking for again.
    fn is_transient(&self) -> bool {
        match self {
            AnalysisError::Llm(e) => e.is_transient(),
            AnalysisError::Malformed(_) => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub max_attempts: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub repair_policy: RepairPolicy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 2000,
            max_backoff_ms: 30000,
            repair_policy: RepairPolicy::Repair,
        }
    }
}

impl AnalyzerConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.initial_backoff_ms, self.max_backoff_ms)
    }
}

pub struct SentimentAnalyzer {
    client: Arc<dyn LlmClient>,
    profile: TopicProfile,
    schema: Value,
    retry: RetryPolicy,
    repair_policy: RepairPolicy,
    metrics: Arc<AnalysisMetrics>,
}

impl SentimentAnalyzer {
    pub fn new(client: Arc<dyn LlmClient>, profile: TopicProfile, config: &AnalyzerConfig) -> Self {
        Self {
            client,
            profile,
            schema: response_schema(),
            retry: config.retry_policy(),
            repair_policy: config.repair_policy,
            metrics: AnalysisMetrics::new(),
        }
    }

    /// Replace the retry policy; tests use this to drop the backoff.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn metrics(&self) -> Arc<AnalysisMetrics> {
        self.metrics.clone()
    }

    pub async fn analyze(&self, candidate: &FilteredItem) -> Result<SentimentResult, AnalysisError> {
        let item = &candidate.item;
        let timer = TimedOperation::start();
        self.metrics.record_submitted();

        let wrap = |analysis| SentimentResult {
            text: item.text.clone(),
            context: item.context().to_string(),
            metadata: item.meta.clone(),
            analysis,
        };

        if item.text.trim().is_empty() {
            self.metrics.record_success(timer.elapsed(), false);
            return Ok(wrap(Analysis::empty()));
        }

        let prompt = build_sentiment_prompt(&self.profile, &self.schema, item.context(), &item.text);
        let mut attempts = 0usize;
        let outcome = self
            .retry
            .retry("sentiment_analysis", || {
                attempts += 1;
                let prompt = prompt.as_str();
                async move {
                    let raw = self.client.classify(prompt, &self.schema).await?;
                    Ok::<_, AnalysisError>(validate_and_repair(&raw, self.repair_policy)?)
                }
            })
            .await;

        self.metrics.record_retries(attempts.saturating_sub(1));

        match outcome {
            Ok(repaired) => {
                if repaired.was_repaired() {
                    debug!(item_id = item.id(), fixes = ?repaired.fixes, "Repaired model answer");
                }
                self.metrics.record_success(timer.elapsed(), repaired.was_repaired());
                Ok(wrap(repaired.analysis))
            }
            Err(e) => {
                warn!(item_id = item.id(), attempts, error = %e, "Sentiment analysis failed");
                self.metrics.record_failure();
                Err(e)
            }
        }
    }
}
