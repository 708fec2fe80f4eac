//! Per-item sentiment classification: prompt, model call with retry,
//! validation and repair of the answer, and the bounded worker pool that
//! runs it over a batch.

pub mod analyzer;
pub mod metrics;
pub mod pool;
pub mod prompt;
pub mod repair;
pub mod schema;

pub use analyzer::{AnalysisError, AnalyzerConfig, SentimentAnalyzer};
pub use metrics::{AnalysisMetrics, MetricsSnapshot};
pub use pool::{BatchOutcome, CancelFlag, ItemFailure, PoolConfig, analyze_batch};
pub use prompt::build_sentiment_prompt;
pub use repair::{RepairError, RepairPolicy, Repaired, validate_and_repair};
pub use schema::{Analysis, EdgeCases, Field, FieldSentiment, Sentiment, SentimentResult, Theme, response_schema};
