use anyhow::Result;
use ingest::{Post, RelevanceVerdict, Source, Thread};
use tracing::{debug, info};

use crate::quick::{QuickFilter, TopicProfile};
use crate::relevance::RelevanceFilter;

#[derive(Debug, Default)]
pub struct ScreenOutcome {
    pub threads: Vec<Thread>,
    pub rejected: usize,
    pub auto_accepted: usize,
    pub verified: usize,
    pub dropped: usize,
}

fn auto_accept_verdict(profile: &TopicProfile, post: &Post, reason: &str) -> RelevanceVerdict {
    let content = format!("{}{}", post.title, post.selftext).to_lowercase();
    RelevanceVerdict {
        is_relevant: true,
        mentions_company: true,
        mentions_product: content.contains(&profile.product_lower()),
        relevance_score: 9.0,
        reasoning: format!("Auto-accepted by filter: {reason}"),
        auto_accepted: true,
        error: None,
    }
}

/// Ingestion-time screening: the quick filter rejects or auto-accepts each
/// post, the rest go through the relevance model. Comments are fetched only
/// for posts that survive the quick filter.
pub async fn screen_threads(
    source: &dyn Source,
    posts: Vec<Post>,
    quick: &QuickFilter,
    relevance: &RelevanceFilter,
    profile: &TopicProfile,
) -> Result<ScreenOutcome> {
    let total = posts.len();
    let mut outcome = ScreenOutcome::default();
    let mut needs_llm = Vec::new();

    for post in posts {
        let verdict = quick.check(&post);
        if !verdict.keep {
            debug!(post_id = %post.id, reason = %verdict.reason, "Rejected by quick filter");
            outcome.rejected += 1;
        } else if quick.auto_accepts(&verdict) {
            debug!(post_id = %post.id, confidence = verdict.confidence, reason = %verdict.reason, "Auto-accepted");
            let comments = source.comments(&post).await?;
            let llm_filter = auto_accept_verdict(profile, &post, &verdict.reason);
            outcome.threads.push(Thread::new(post, comments, llm_filter));
            outcome.auto_accepted += 1;
        } else {
            needs_llm.push(post);
        }
    }

    info!(
        total,
        rejected = outcome.rejected,
        auto_accepted = outcome.auto_accepted,
        needs_llm = needs_llm.len(),
        "Quick filter complete"
    );

    let pending = needs_llm.len();
    for (idx, post) in needs_llm.into_iter().enumerate() {
        debug!(post_id = %post.id, position = idx + 1, pending, "Verifying relevance");
        let comments = source.comments(&post).await?;
        let (keep, verdict) = relevance.screen(&post, &comments).await;
        if keep {
            outcome.threads.push(Thread::new(post, comments, verdict));
            outcome.verified += 1;
        } else {
            outcome.dropped += 1;
        }
    }

    info!(
        kept = outcome.threads.len(),
        verified = outcome.verified,
        dropped = outcome.dropped,
        "Relevance screening complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relevance::RelevanceConfig;
    use async_trait::async_trait;
    use ingest::Comment;
    use llm::{LlmClient, LlmError, RetryPolicy};
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct Posts(Vec<Post>);

    #[async_trait]
    impl Source for Posts {
        fn name(&self) -> &str {
            "test"
        }

        async fn search(&self, _query: &str, _max_posts: usize) -> Result<Vec<Post>> {
            Ok(self.0.clone())
        }

        async fn comments(&self, post: &Post) -> Result<Vec<Comment>> {
            Ok(vec![Comment { id: format!("{}-c", post.id), body: "A comment".into(), ..Default::default() }])
        }
    }

    struct NotRelevant;

    #[async_trait]
    impl LlmClient for NotRelevant {
        fn name(&self) -> &str {
            "not-relevant"
        }

        async fn classify(&self, _prompt: &str, _schema: &Value) -> Result<Value, LlmError> {
            Ok(json!({"is_relevant": false, "mentions_company": true, "relevance_score": 2}))
        }
    }

    fn post(id: &str, title: &str) -> Post {
        Post { id: id.into(), subreddit: "misc".into(), title: title.into(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_screening_routes_posts() {
        let profile = TopicProfile::default();
        let quick = QuickFilter::new(&profile, 0.8);
        let relevance = RelevanceFilter::new(
            Arc::new(NotRelevant),
            profile.clone(),
            RelevanceConfig::default(),
            RetryPolicy::new(1, 1, 1),
        );
        let posts = vec![
            post("strong", "Taboola Realize results"),
            post("weak", "Taboola and the revenue question"),
            post("none", "Outbrain only"),
        ];
        let source = Posts(posts.clone());

        let outcome = screen_threads(&source, posts, &quick, &relevance, &profile).await.unwrap();

        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.auto_accepted, 1);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.threads.len(), 1);
        let kept = &outcome.threads[0];
        assert_eq!(kept.post.id, "strong");
        assert!(kept.llm_filter.auto_accepted);
        assert!(kept.llm_filter.mentions_product);
        assert_eq!(kept.comments.len(), 1);
    }
}
