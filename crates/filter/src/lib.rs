//! Everything that decides whether an item is worth a sentiment call:
//! dedup, bot and short-comment removal, and the two relevance screens
//! (keyword heuristics, then an LLM check) used at ingestion time.

pub mod bots;
pub mod dedup;
pub mod quick;
pub mod relevance;
pub mod screen;

use ingest::{IngestionDocument, ItemKind, RawItem, RelevanceVerdict};
use serde::{Deserialize, Serialize};
use tracing::info;

pub use bots::BotDetector;
pub use dedup::dedup_by;
pub use quick::{QuickFilter, QuickVerdict, TopicProfile};
pub use relevance::{FailurePolicy, RelevanceConfig, RelevanceFilter, filter_schema, parse_verdict};
pub use screen::{ScreenOutcome, screen_threads};

/// How an item came to be considered relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    AutoAccepted,
    Verified,
    /// The relevance model failed and the post was kept anyway.
    FailedOpen,
    /// No verdict of its own; trusted because the input document holds it.
    Inherited,
}

impl Relevance {
    pub fn from_verdict(verdict: &RelevanceVerdict) -> Self {
        if verdict.auto_accepted {
            Relevance::AutoAccepted
        } else if verdict.error.is_some() {
            Relevance::FailedOpen
        } else if verdict.is_relevant {
            Relevance::Verified
        } else {
            Relevance::Inherited
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredItem {
    pub item: RawItem,
    pub relevance: Relevance,
}

impl FilteredItem {
    pub fn new(item: RawItem, relevance: Relevance) -> Self {
        Self { item, relevance }
    }
}

/// Flatten a document into candidate items, each tagged with its thread's
/// relevance.
pub fn candidates(document: &IngestionDocument) -> Vec<FilteredItem> {
    document
        .posts
        .iter()
        .flat_map(|thread| {
            let relevance = Relevance::from_verdict(&thread.llm_filter);
            thread
                .items()
                .into_iter()
                .map(move |item| FilteredItem::new(item, relevance))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub profile: TopicProfile,
    /// Comments this short or shorter carry no usable sentiment.
    pub min_comment_chars: usize,
    pub auto_accept_threshold: f64,
    pub relevance: RelevanceConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            profile: TopicProfile::default(),
            min_comment_chars: 20,
            auto_accept_threshold: 0.8,
            relevance: RelevanceConfig::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<FilteredItem>,
    pub duplicates: usize,
    pub bots: usize,
    pub short: usize,
}

/// Analyze-time filtering: dedup, then bots, then short comments.
pub struct FilterStage {
    bots: BotDetector,
    min_comment_chars: usize,
}

impl FilterStage {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            bots: BotDetector::new(),
            min_comment_chars: config.min_comment_chars,
        }
    }

    pub fn apply(&self, items: Vec<FilteredItem>) -> FilterOutcome {
        let total = items.len();
        let (unique, duplicates) = dedup_by(items, |f| f.item.id());

        let mut outcome = FilterOutcome { duplicates, ..Default::default() };
        for candidate in unique {
            if self.bots.is_bot(&candidate.item) {
                outcome.bots += 1;
                continue;
            }
            if self.is_short_comment(&candidate.item) {
                outcome.short += 1;
                continue;
            }
            outcome.kept.push(candidate);
        }

        info!(
            total,
            kept = outcome.kept.len(),
            duplicates = outcome.duplicates,
            bots = outcome.bots,
            short = outcome.short,
            "Filter stage complete"
        );
        outcome
    }

    fn is_short_comment(&self, item: &RawItem) -> bool {
        item.kind() == ItemKind::Comment && item.text.trim().chars().count() <= self.min_comment_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::{Comment, Post, Thread};

    fn document() -> IngestionDocument {
        let post = Post {
            id: "p1".into(),
            subreddit: "adops".into(),
            title: "Taboola Realize first impressions".into(),
            selftext: "Switched our widgets last month".into(),
            ..Default::default()
        };
        let comments = vec![
            Comment { id: "c1".into(), author: Some("dev".into()), body: "The dashboard is slow but the payouts are fine".into(), ..Default::default() },
            Comment { id: "c2".into(), author: Some("AutoModerator".into()), body: "Please read the subreddit rules before posting".into(), ..Default::default() },
            Comment { id: "c3".into(), author: Some("x".into()), body: "+1".into(), ..Default::default() },
            Comment { id: "c1".into(), author: Some("dev".into()), body: "The dashboard is slow but the payouts are fine".into(), ..Default::default() },
        ];
        let verdict = RelevanceVerdict { is_relevant: true, auto_accepted: true, ..Default::default() };
        IngestionDocument::new("reddit", Vec::new(), 10, vec![Thread::new(post, comments, verdict)])
    }

    #[test]
    fn test_candidates_carry_thread_relevance() {
        let items = candidates(&document());
        assert_eq!(items.len(), 5);
        assert!(items.iter().all(|i| i.relevance == Relevance::AutoAccepted));
    }

    #[test]
    fn test_stage_order_and_counts() {
        let outcome = FilterStage::new(&FilterConfig::default()).apply(candidates(&document()));
        let ids: Vec<_> = outcome.kept.iter().map(|f| f.item.id()).collect();
        assert_eq!(ids, vec!["p1", "c1"]);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.bots, 1);
        assert_eq!(outcome.short, 1);
    }

    #[test]
    fn test_relevance_from_verdict() {
        let failed = RelevanceVerdict { error: Some("503".into()), ..Default::default() };
        assert_eq!(Relevance::from_verdict(&failed), Relevance::FailedOpen);
        let verified = RelevanceVerdict { is_relevant: true, ..Default::default() };
        assert_eq!(Relevance::from_verdict(&verified), Relevance::Verified);
        assert_eq!(Relevance::from_verdict(&RelevanceVerdict::default()), Relevance::Inherited);
    }
}
