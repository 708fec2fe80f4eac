use ingest::{Comment, Post, RelevanceVerdict};
use llm::{LlmClient, LlmError, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info};

use crate::quick::TopicProfile;

/// What to do with a post when the relevance model cannot be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail open: keep the post and record the error.
    #[default]
    KeepOnError,
    DropOnError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceConfig {
    pub min_score: f64,
    pub max_comment_sample: usize,
    pub failure_policy: FailurePolicy,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            min_score: 7.0,
            max_comment_sample: 5,
            failure_policy: FailurePolicy::KeepOnError,
        }
    }
}

pub fn filter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "is_relevant": {"type": "boolean"},
            "mentions_company": {"type": "boolean"},
            "mentions_product": {"type": "boolean"},
            "relevance_score": {"type": "number", "minimum": 0, "maximum": 10},
            "reasoning": {"type": "string"}
        },
        "required": ["is_relevant", "mentions_company", "relevance_score"]
    })
}

/// LLM check that a post is really about the tracked company rather than a
/// passing mention.
pub struct RelevanceFilter {
    client: Arc<dyn LlmClient>,
    profile: TopicProfile,
    config: RelevanceConfig,
    retry: RetryPolicy,
    schema: Value,
}

impl RelevanceFilter {
    pub fn new(client: Arc<dyn LlmClient>, profile: TopicProfile, config: RelevanceConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            profile,
            config,
            retry,
            schema: filter_schema(),
        }
    }

    /// Top-level comments with the highest score, at most `max_comment_sample`.
    pub fn sample_comments<'a>(&self, comments: &'a [Comment]) -> Vec<&'a Comment> {
        let mut top: Vec<&Comment> = comments.iter().filter(|c| c.depth == 0).collect();
        top.sort_by(|a, b| b.score.cmp(&a.score));
        top.truncate(self.config.max_comment_sample);
        top
    }

    pub fn build_prompt(&self, post: &Post, comments: &[&Comment]) -> String {
        let company = &self.profile.company;
        let product = &self.profile.product;
        let mut lines = vec![
            format!("You are a semantic filter that determines if content is about {company}, the advertising company/platform."),
            "Rules:".to_string(),
            format!("1. Confirm the post chiefly revolves around {company}; brief or passing mentions must be rejected."),
            format!("2. Only treat '{product}' as {company}'s product when it is explicitly described as such."),
            format!("3. Ignore generic uses of the word '{}'.", product.to_lowercase()),
            "4. Be conservative; if unsure, mark the content as not relevant.".to_string(),
            String::new(),
            format!("Source: {}", post.subreddit),
            format!("Post Title: {}", post.title),
            format!(
                "Post Body: {}",
                if post.selftext.trim().is_empty() { "(empty)" } else { post.selftext.as_str() }
            ),
        ];

        if !comments.is_empty() {
            lines.push(String::new());
            lines.push("Sampled top comments:".to_string());
            for (idx, comment) in comments.iter().enumerate() {
                lines.push(format!("{}. {}", idx + 1, comment.body.replace('\n', " ").trim()));
            }
        }

        lines.push(String::new());
        lines.push("Return JSON matching this exact schema:".to_string());
        lines.push(serde_json::to_string_pretty(&self.schema).unwrap_or_default());
        lines.join("\n")
    }

    /// Ask the model and return its verdict. Failures produce a verdict
    /// with `error` set instead of an `Err`.
    pub async fn verify(&self, post: &Post, comments: &[Comment]) -> RelevanceVerdict {
        let sample = self.sample_comments(comments);
        let prompt = self.build_prompt(post, &sample);

        let result: Result<Value, LlmError> = self
            .retry
            .retry("relevance_filter", || self.client.classify(&prompt, &self.schema))
            .await;

        match result {
            Ok(value) => parse_verdict(&value),
            Err(e) => {
                error!(post_id = %post.id, error = %e, "Relevance filter failed");
                RelevanceVerdict {
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        }
    }

    /// Relevant iff the model says so, names the company, and scores at
    /// least `min_score`. Errored verdicts follow the failure policy.
    pub fn accepts(&self, verdict: &RelevanceVerdict) -> bool {
        if verdict.error.is_some() {
            return self.config.failure_policy == FailurePolicy::KeepOnError;
        }
        verdict.is_relevant && verdict.mentions_company && verdict.relevance_score >= self.config.min_score
    }

    pub async fn screen(&self, post: &Post, comments: &[Comment]) -> (bool, RelevanceVerdict) {
        let verdict = self.verify(post, comments).await;
        let keep = self.accepts(&verdict);
        info!(
            post_id = %post.id,
            is_relevant = verdict.is_relevant,
            relevance_score = verdict.relevance_score,
            failed = verdict.error.is_some(),
            keep,
            "Relevance verdict"
        );
        (keep, verdict)
    }
}

fn flag(value: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find_map(|v| match v {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(s.eq_ignore_ascii_case("true")),
            _ => None,
        })
        .unwrap_or(false)
}

/// Read a model answer leniently: booleans may arrive as strings, the score
/// as a string, and older key names are accepted.
pub fn parse_verdict(value: &Value) -> RelevanceVerdict {
    let score = match value.get("relevance_score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    RelevanceVerdict {
        is_relevant: flag(value, &["is_relevant"]),
        mentions_company: flag(value, &["mentions_company", "mentions_taboola"]),
        mentions_product: flag(value, &["mentions_product", "mentions_realize_product"]),
        relevance_score: score.clamp(0.0, 10.0),
        reasoning: value
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        auto_accepted: false,
        error: None,
    }
}
