use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use super::{Source, mentions};
use crate::HACKER_NEWS_SOURCE;
use crate::document::{Comment, Post};
use crate::http::HttpFetcher;

const SEARCH_URL: &str = "https://hn.algolia.com/api/v1/search";
const ITEM_URL: &str = "https://hacker-news.firebaseio.com/v0/item";

#[derive(Debug, Clone)]
pub struct HackerNewsSettings {
    pub max_comments_per_story: usize,
    /// 0 keeps top-level comments only.
    pub max_comment_depth: u32,
}

impl Default for HackerNewsSettings {
    fn default() -> Self {
        Self {
            max_comments_per_story: 10,
            max_comment_depth: 0,
        }
    }
}

pub struct HackerNewsSource {
    http: HttpFetcher,
    settings: HackerNewsSettings,
}

impl HackerNewsSource {
    pub fn new(http: HttpFetcher, settings: HackerNewsSettings) -> Self {
        Self { http, settings }
    }

    async fn item(&self, id: &str) -> Option<Value> {
        let url = format!("{ITEM_URL}/{id}.json");
        match self.http.get_json(&url, &[]).await {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                warn!(item_id = id, error = %e, "Failed to fetch HN item");
                None
            }
        }
    }
}

#[async_trait]
impl Source for HackerNewsSource {
    fn name(&self) -> &str {
        HACKER_NEWS_SOURCE
    }

    async fn search(&self, query: &str, max_posts: usize) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let mut seen = HashSet::new();
        let hits_per_page = max_posts.clamp(1, 100);
        let mut page = 0u64;

        while posts.len() < max_posts {
            let params = [
                ("query", query.to_string()),
                ("tags", "story".to_string()),
                ("hitsPerPage", hits_per_page.to_string()),
                ("page", page.to_string()),
            ];
            let payload = match self.http.get_json(SEARCH_URL, &params).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(query, error = %e, "HN search request failed");
                    break;
                }
            };

            let hits = parse_search_hits(&payload);
            if hits.is_empty() {
                break;
            }
            for post in hits {
                if !mentions(&[post.title.as_str(), post.selftext.as_str(), post.url.as_str()], query) {
                    continue;
                }
                if !seen.insert(post.id.clone()) {
                    continue;
                }
                posts.push(post);
                if posts.len() >= max_posts {
                    break;
                }
            }

            page += 1;
            let pages = payload.get("nbPages").and_then(Value::as_u64).unwrap_or(0);
            if page >= pages {
                break;
            }
        }

        info!(query, found = posts.len(), "HN search");
        Ok(posts)
    }

    /// Depth-first walk over the story's kids, bounded by depth and count.
    async fn comments(&self, post: &Post) -> Result<Vec<Comment>> {
        let Some(story) = self.item(&post.id).await else {
            return Ok(Vec::new());
        };

        let max = self.settings.max_comments_per_story;
        let mut collected = Vec::new();
        let mut stack: Vec<(String, u32)> = kid_ids(&story).into_iter().rev().map(|id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            if collected.len() >= max {
                break;
            }
            let Some(item) = self.item(&id).await else {
                continue;
            };
            let Some(comment) = comment_from_item(&item, &post.id, depth) else {
                continue;
            };
            collected.push(comment);

            if depth < self.settings.max_comment_depth {
                for kid in kid_ids(&item).into_iter().rev() {
                    stack.push((kid, depth + 1));
                }
            }
        }

        Ok(collected)
    }
}

fn lossy_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    }
}

fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kid_ids(item: &Value) -> Vec<String> {
    item.get("kids")
        .and_then(Value::as_array)
        .map(|kids| kids.iter().filter_map(|k| id_string(Some(k))).collect())
        .unwrap_or_default()
}

/// Stories from an Algolia search response, mapped onto the shared post
/// shape.
pub fn parse_search_hits(payload: &Value) -> Vec<Post> {
    let Some(hits) = payload.get("hits").and_then(Value::as_array) else {
        return Vec::new();
    };
    hits.iter()
        .filter_map(|hit| {
            let id = id_string(hit.get("objectID"))?;
            let text = |key: &str| hit.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
            let url = text("url");
            Some(Post {
                permalink: format!("https://news.ycombinator.com/item?id={id}"),
                subreddit: HACKER_NEWS_SOURCE.to_string(),
                title: text("title"),
                selftext: strip_html(&text("story_text")),
                author: hit.get("author").and_then(Value::as_str).map(str::to_string),
                is_self: url.is_empty(),
                url,
                created_utc: lossy_i64(hit.get("created_at_i")),
                score: lossy_i64(hit.get("points")),
                num_comments: lossy_i64(hit.get("num_comments")),
                over_18: false,
                id,
            })
        })
        .collect()
}

/// `None` for deleted, dead or non-comment payloads.
pub fn comment_from_item(item: &Value, post_id: &str, depth: u32) -> Option<Comment> {
    let flag = |key: &str| item.get(key).and_then(Value::as_bool).unwrap_or(false);
    if flag("deleted") || flag("dead") {
        return None;
    }
    let id = id_string(item.get("id"))?;
    Some(Comment {
        id,
        post_id: post_id.to_string(),
        parent_id: id_string(item.get("parent")),
        author: item.get("by").and_then(Value::as_str).map(str::to_string),
        body: strip_html(item.get("text").and_then(Value::as_str).unwrap_or_default()),
        created_utc: lossy_i64(item.get("time")),
        score: lossy_i64(item.get("score")),
        depth,
    })
}

/// HN bodies are HTML fragments. Paragraph tags become spaces, other tags
/// are dropped and the common entities decoded.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let decoded = out
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_hits() {
        let payload = json!({
            "nbPages": 1,
            "hits": [
                {"objectID": "101", "title": "Taboola acquires something", "url": "https://example.com/a",
                    "author": "pg", "created_at_i": 1704067200, "points": 50, "num_comments": 12},
                {"objectID": "102", "title": "Ask HN: Taboola ads?", "story_text": "<p>Anyone use them&#x27;?</p>",
                    "points": null},
                {"title": "missing id"}
            ]
        });
        let posts = parse_search_hits(&payload);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].subreddit, "hackernews");
        assert_eq!(posts[0].permalink, "https://news.ycombinator.com/item?id=101");
        assert!(!posts[0].is_self);
        assert!(posts[1].is_self);
        assert_eq!(posts[1].selftext, "Anyone use them'?");
        assert_eq!(posts[1].score, 0);
    }

    #[test]
    fn test_comment_from_item_skips_dead_and_deleted() {
        let live = json!({"id": 7, "by": "dang", "text": "Fine &amp; dandy", "time": 1704067200, "parent": 101});
        let comment = comment_from_item(&live, "101", 0).unwrap();
        assert_eq!(comment.id, "7");
        assert_eq!(comment.parent_id.as_deref(), Some("101"));
        assert_eq!(comment.body, "Fine & dandy");

        assert!(comment_from_item(&json!({"id": 8, "deleted": true}), "101", 0).is_none());
        assert!(comment_from_item(&json!({"id": 9, "dead": true, "text": "x"}), "101", 0).is_none());
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>One</p><p>Two <i>three</i></p>"), "One Two three");
    }
}
