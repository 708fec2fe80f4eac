use filter::FilteredItem;
use futures::StreamExt;
use futures::future;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

use crate::analyzer::{AnalysisError, SentimentAnalyzer};
use crate::schema::SentimentResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_workers: usize,
    /// Pause between two submissions, in milliseconds.
    pub request_delay_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            request_delay_ms: 250,
        }
    }
}

/// Cooperative stop signal. Once set, no new items are submitted; items
/// already in flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// In input order.
    pub results: Vec<SentimentResult>,
    pub failures: Vec<ItemFailure>,
    /// Never submitted because of cancellation.
    pub skipped: usize,
}

/// Analyze `items` with at most `max_workers` calls in flight. Results come
/// back in input order regardless of completion order.
pub async fn analyze_batch(
    items: Vec<FilteredItem>,
    analyzer: &SentimentAnalyzer,
    config: &PoolConfig,
    cancel: &CancelFlag,
) -> BatchOutcome {
    let total = items.len();
    let workers = config.max_workers.max(1);
    let delay = Duration::from_millis(config.request_delay_ms);
    let progress_every = (total / 5).max(1);

    let submissions = stream::iter(items.into_iter().enumerate())
        .then(move |(idx, item)| async move {
            if idx > 0 && !delay.is_zero() {
                sleep(delay).await;
            }
            (idx, item)
        })
        .take_while(|_| future::ready(!cancel.is_cancelled()))
        .map(|(idx, item)| async move {
            let outcome: Result<SentimentResult, AnalysisError> = analyzer.analyze(&item).await;
            (idx, item.item.id().to_string(), outcome)
        })
        .buffer_unordered(workers);
    let mut submissions = pin!(submissions);

    let mut finished = Vec::with_capacity(total);
    while let Some(done) = submissions.next().await {
        finished.push(done);
        let completed = finished.len();
        if completed % progress_every == 0 || completed == total {
            info!(completed, total, "Analysis progress");
        }
    }

    finished.sort_by_key(|(idx, _, _)| *idx);
    let skipped = total - finished.len();
    analyzer.metrics().record_skipped(skipped);

    let mut outcome = BatchOutcome { skipped, ..Default::default() };
    for (_, id, result) in finished {
        match result {
            Ok(result) => outcome.results.push(result),
            Err(e) => outcome.failures.push(ItemFailure { id, error: e.to_string() }),
        }
    }

    info!(
        succeeded = outcome.results.len(),
        failed = outcome.failures.len(),
        skipped,
        "Analysis batch complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::{ScriptedClient, analyzer, candidate, negative_answer};
    use crate::repair::RepairPolicy;
    use llm::LlmError;
    use serde_json::json;

    fn fast() -> PoolConfig {
        PoolConfig { max_workers: 3, request_delay_ms: 0 }
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let client = ScriptedClient::new(vec![Ok(negative_answer())]);
        let analyzer = analyzer(client, RepairPolicy::Repair);
        let items: Vec<_> = (0..8).map(|i| candidate(&format!("c{i}"), "Taboola ads everywhere")).collect();

        let outcome = analyze_batch(items, &analyzer, &fast(), &CancelFlag::new()).await;

        let ids: Vec<_> = outcome.results.iter().map(|r| r.metadata.id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"]);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.skipped, 0);
    }

    #[tokio::test]
    async fn test_failures_are_collected_and_excluded() {
        let client = ScriptedClient::new(vec![
            Ok(negative_answer()),
            Err(LlmError::Status { status: 400, snippet: "bad".into() }),
            Ok(json!({"overall_sentiment": "positive"})),
        ]);
        let analyzer = analyzer(client, RepairPolicy::Repair);
        let items = vec![candidate("a", "first item"), candidate("b", "second item"), candidate("c", "third item")];

        let config = PoolConfig { max_workers: 1, request_delay_ms: 0 };
        let outcome = analyze_batch(items, &analyzer, &config, &CancelFlag::new()).await;

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.failures, vec![ItemFailure { id: "b".into(), error: "provider returned status 400: bad".into() }]);
        assert_eq!(analyzer.metrics().snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let client = ScriptedClient::new(vec![Ok(negative_answer())]);
        let analyzer = analyzer(client.clone(), RepairPolicy::Repair);
        let items = vec![candidate("a", "first item"), candidate("b", "second item")];
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = analyze_batch(items, &analyzer, &fast(), &cancel).await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.skipped, 2);
        assert_eq!(client.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(analyzer.metrics().snapshot().skipped, 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = ScriptedClient::new(vec![Ok(negative_answer())]);
        let analyzer = analyzer(client, RepairPolicy::Repair);
        let outcome = analyze_batch(Vec::new(), &analyzer, &fast(), &CancelFlag::new()).await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.skipped, 0);
    }
}
