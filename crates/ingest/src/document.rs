use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::item::{ItemKind, ItemMetadata, RawItem, stable_id};

/// Hand-written documents use `null` for absent values; read those as the
/// type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A post as returned by a source. Hacker News stories use the same shape
/// with `subreddit = "hackernews"` so downstream code never branches on
/// platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Post {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subreddit: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub permalink: String,
    #[serde(default, deserialize_with = "nullable")]
    pub created_utc: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub score: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub num_comments: i64,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub is_self: bool,
}

impl Post {
    /// Title and body joined, the text the filters and the analyzer see.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.selftext).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Comment {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub post_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    #[serde(default, deserialize_with = "nullable")]
    pub created_utc: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub score: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub depth: u32,
}

/// Outcome of the relevance screening, stored per thread as `llm_filter`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RelevanceVerdict {
    #[serde(default)]
    pub is_relevant: bool,
    #[serde(default, alias = "mentions_taboola")]
    pub mentions_company: bool,
    #[serde(default, alias = "mentions_realize_product")]
    pub mentions_product: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub relevance_score: f64,
    #[serde(default, deserialize_with = "nullable", alias = "raw_model_response")]
    pub reasoning: String,
    #[serde(default, alias = "filter_auto_accepted")]
    pub auto_accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One entry of the document's `posts` array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thread {
    pub post: Post,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub llm_filter: RelevanceVerdict,
}

impl Thread {
    pub fn new(post: Post, comments: Vec<Comment>, llm_filter: RelevanceVerdict) -> Self {
        Self { post, comments, llm_filter }
    }

    /// Flatten into analyzable items: the post first (skipped when it has
    /// no text), then its comments in source order.
    pub fn items(&self) -> Vec<RawItem> {
        let mut items = Vec::with_capacity(self.comments.len() + 1);
        let post = &self.post;

        let post_text = post.text();
        if !post_text.is_empty() {
            let url = if !post.url.is_empty() {
                post.url.clone()
            } else if post.permalink.starts_with('/') {
                format!("https://www.reddit.com{}", post.permalink)
            } else {
                post.permalink.clone()
            };
            items.push(RawItem {
                meta: ItemMetadata {
                    id: post.id.clone(),
                    kind: ItemKind::Post,
                    source: post.subreddit.clone(),
                    author: post.author.clone().unwrap_or_default(),
                    created_utc: post.created_utc,
                    score: post.score,
                    num_comments: post.num_comments,
                    url,
                    post_id: None,
                    depth: 0,
                },
                text: post_text,
            });
        }

        for comment in &self.comments {
            items.push(RawItem {
                meta: ItemMetadata {
                    id: comment.id.clone(),
                    kind: ItemKind::Comment,
                    source: post.subreddit.clone(),
                    author: comment.author.clone().unwrap_or_default(),
                    created_utc: comment.created_utc,
                    score: comment.score,
                    num_comments: 0,
                    url: String::new(),
                    post_id: Some(post.id.clone()),
                    depth: comment.depth,
                },
                text: comment.body.trim().to_string(),
            });
        }

        items
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DocumentMetadata {
    #[serde(default, deserialize_with = "nullable")]
    pub generated_at_utc: String,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_posts_per_query: usize,
    #[serde(default, deserialize_with = "nullable")]
    pub source: String,
}

/// The ingestion output consumed by the analyzer:
/// `{"metadata": {...}, "posts": [{"post", "comments", "llm_filter"}]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IngestionDocument {
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub posts: Vec<Thread>,
}

impl IngestionDocument {
    pub fn new(source: &str, search_queries: Vec<String>, max_posts_per_query: usize, posts: Vec<Thread>) -> Self {
        Self {
            metadata: DocumentMetadata {
                generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                search_queries,
                max_posts_per_query,
                source: source.to_string(),
            },
            posts,
        }
    }

    /// All items in document order. Duplicates are kept; dedup is the
    /// filter stage's job.
    pub fn items(&self) -> Vec<RawItem> {
        self.posts.iter().flat_map(Thread::items).collect()
    }

    /// Assign stable ids to posts and comments that arrived without one
    /// (hand-written or generated datasets).
    pub fn fill_missing_ids(&mut self) -> usize {
        let mut filled = 0;
        for thread in &mut self.posts {
            if thread.post.id.trim().is_empty() {
                thread.post.id = stable_id(&thread.post.subreddit, &thread.post.text(), thread.post.created_utc);
                filled += 1;
            }
            for comment in &mut thread.comments {
                if comment.post_id.is_empty() {
                    comment.post_id = thread.post.id.clone();
                }
                if comment.id.trim().is_empty() {
                    comment.id = stable_id(&thread.post.subreddit, &comment.body, comment.created_utc);
                    filled += 1;
                }
            }
        }
        filled
    }
}
