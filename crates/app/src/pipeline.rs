use aggregate::Aggregation;
use aggregate::export::{find_output_dirs, rebuild_bundles, recompute, write_outputs};
use anyhow::{Context, Result};
use filter::{FilterStage, QuickFilter, RelevanceFilter, TopicProfile, candidates, screen_threads};
use ingest::{
    HACKER_NEWS_SOURCE, HackerNewsSource, HttpFetcher, IngestionDocument, RedditSource, Source, SyntheticSource,
    collect_posts,
};
use llm::LlmClient;
use sentiment::{CancelFlag, ItemFailure, MetricsSnapshot, SentimentAnalyzer, analyze_batch};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::{IngestArgs, SourceKind};
use crate::config::{AppConfig, ConfigError};

/// Queries used when none are given: the company, then company + product.
pub fn default_queries(profile: &TopicProfile) -> Vec<String> {
    vec![
        profile.company.clone(),
        format!("{} {}", profile.company, profile.product),
    ]
}

/// Output subdirectory for a document's source, under the configured
/// output root.
pub fn output_subdir(source: &str) -> &'static str {
    match source {
        "reddit" => "REDDIT_DATA",
        HACKER_NEWS_SOURCE => "HACKER_NEWS_DATA",
        _ => "AI_GENERATED_DATA",
    }
}

async fn build_source(args: &IngestArgs, config: &AppConfig) -> Result<Box<dyn Source>> {
    let source: Box<dyn Source> = match args.source {
        SourceKind::Reddit => {
            let http = HttpFetcher::new(config.http_settings(&config.ingest.reddit_user_agent))?;
            Box::new(RedditSource::new(http)?)
        }
        SourceKind::Hackernews => {
            let http = HttpFetcher::new(config.http_settings(&config.ingest.hn_user_agent))?;
            Box::new(HackerNewsSource::new(http, config.hacker_news_settings()))
        }
        SourceKind::Synthetic => {
            let input = args
                .input
                .as_deref()
                .ok_or_else(|| ConfigError::Constraint("--input is required for the synthetic source".into()))?;
            Box::new(SyntheticSource::load(input).await?)
        }
    };
    Ok(source)
}

/// Fetch, screen and write an ingestion document. Returns its path.
pub async fn run_ingest(args: &IngestArgs, config: &AppConfig, client: Arc<dyn LlmClient>) -> Result<PathBuf> {
    let profile = config.profile();
    let source = build_source(args, config).await?;
    let queries = if args.queries.is_empty() {
        default_queries(&profile)
    } else {
        args.queries.clone()
    };
    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| args.source.default_output());

    info!(source = source.name(), ?queries, max_posts_per_query = args.max_posts_per_query, "Starting ingestion");
    let posts = collect_posts(source.as_ref(), &queries, args.max_posts_per_query).await?;

    let quick = QuickFilter::new(&profile, config.filter.auto_accept_threshold);
    let relevance = RelevanceFilter::new(client, profile.clone(), config.filter.relevance.clone(), config.retry_policy());
    let outcome = screen_threads(source.as_ref(), posts, &quick, &relevance, &profile).await?;

    let document = IngestionDocument::new(source.name(), queries, args.max_posts_per_query, outcome.threads);
    document.write(&output_path).await?;

    println!("✅ Wrote {} threads to {}", document.posts.len(), output_path.display());
    println!(
        "   rejected {} | auto-accepted {} | verified {} | dropped {}",
        outcome.rejected, outcome.auto_accepted, outcome.verified, outcome.dropped
    );
    Ok(output_path)
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub input: PathBuf,
    /// Exact output directory; otherwise a per-source directory under the
    /// configured output root.
    pub output_dir: Option<PathBuf>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub processing: MetricsSnapshot,
    pub failures: Vec<ItemFailure>,
    pub filtered_out: usize,
}

/// Load → flatten → filter → analyze → aggregate → write. Item failures are
/// reported in the summary, never returned as errors.
pub async fn run_analyze(
    options: &AnalyzeOptions,
    config: &AppConfig,
    client: Arc<dyn LlmClient>,
    cancel: &CancelFlag,
) -> Result<RunSummary> {
    let document = IngestionDocument::read(&options.input)
        .await
        .with_context(|| format!("Failed to load input {}", options.input.display()))?;
    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.join(output_subdir(&document.metadata.source)));

    let items = candidates(&document);
    let total = items.len();
    let filtered = FilterStage::new(&config.filter).apply(items);
    let mut kept = filtered.kept;
    if let Some(limit) = options.limit {
        kept.truncate(limit);
    }
    let filtered_out = total - kept.len();
    info!(total, queued = kept.len(), client = client.name(), "Starting sentiment analysis");

    let analyzer = SentimentAnalyzer::new(client, config.profile(), &config.analyzer_config());
    let batch = analyze_batch(kept, &analyzer, &config.concurrency, cancel).await;
    for failure in &batch.failures {
        warn!(item_id = %failure.id, error = %failure.error, "Item not analyzed");
    }
    if batch.skipped > 0 {
        warn!(skipped = batch.skipped, "Run cancelled before every item was submitted");
    }

    let processing = analyzer.metrics().snapshot();
    let aggregation = Aggregation::compute(&batch.results, processing.clone(), &config.analysis.themes);
    write_outputs(&output_dir, &batch.results, &aggregation).await?;

    Ok(RunSummary {
        output_dir,
        processing,
        failures: batch.failures,
        filtered_out,
    })
}

/// Recompute (optionally) and rebuild the dashboard bundle of every output
/// directory under `root`.
pub async fn run_aggregate(root: &Path, recompute_first: bool, config: &AppConfig) -> Result<Vec<PathBuf>> {
    if recompute_first {
        for dir in find_output_dirs(root) {
            recompute(&dir, &config.analysis.themes)
                .await
                .with_context(|| format!("Failed to recompute {}", dir.display()))?;
        }
    }
    rebuild_bundles(root).await
}

/// Cancel on Ctrl-C, and after `timeout_secs` when set.
pub fn spawn_cancel_triggers(cancel: &CancelFlag, timeout_secs: Option<u64>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing in-flight items");
            on_signal.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(timeout_secs = secs, "Run timeout reached; no new items will be submitted");
            on_timeout.cancel();
        });
    }
}

pub fn print_summary(summary: &RunSummary) {
    let p = &summary.processing;
    println!("\n=== ANALYSIS COMPLETE ===\n");
    println!("  Processed: {}", p.processed);
    println!("  Succeeded: {}", p.succeeded);
    println!("  Failed:    {}", p.failed);
    if p.skipped > 0 {
        println!("  Skipped:   {}", p.skipped);
    }
    println!("  Filtered:  {}", summary.filtered_out);
    println!("  Repaired:  {}", p.repaired);
    println!("  Retries:   {}", p.retries);
    println!("  Avg latency: {:.0} ms", p.avg_latency_ms);
    println!("\n✅ Results saved to {}", summary.output_dir.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queries() {
        assert_eq!(default_queries(&TopicProfile::default()), vec!["Taboola", "Taboola Realize"]);
    }

    #[test]
    fn test_output_subdir() {
        assert_eq!(output_subdir("reddit"), "REDDIT_DATA");
        assert_eq!(output_subdir("hackernews"), "HACKER_NEWS_DATA");
        assert_eq!(output_subdir("synthetic"), "AI_GENERATED_DATA");
    }
}
