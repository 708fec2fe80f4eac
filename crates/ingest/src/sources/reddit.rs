use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use super::{Source, mentions};
use crate::document::{Comment, Post};
use crate::http::HttpFetcher;

const REDDIT_BASE: &str = "https://www.reddit.com";
const WEB_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const MAX_SEARCH_PAGES: usize = 10;
const MAX_COMMENT_DEPTH: u32 = 4;

/// Subreddits searched individually when the global search comes up short.
pub const RELEVANT_SUBREDDITS: &[&str] = &[
    "advertising",
    "adops",
    "marketing",
    "PPC",
    "webdev",
    "startups",
    "business",
    "SEO",
    "digital_marketing",
    "entrepreneur",
];

/// Pulls Reddit post ids out of a search engine result page.
pub struct LinkExtractor {
    href: Regex,
    post_id: Regex,
}

impl LinkExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            href: Regex::new(r#"href="([^"]+)""#)?,
            post_id: Regex::new(r"(?i)(?:/|%2F)comments(?:/|%2F)([a-z0-9]+)")?,
        })
    }

    /// Ids in page order, first occurrence only. Result links may be direct
    /// or wrapped in a percent-encoded redirect.
    pub fn post_ids(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.href
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|href| href.contains("reddit.com"))
            .filter_map(|href| self.post_id.captures(href))
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_lowercase()))
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }
}

pub struct RedditSource {
    http: HttpFetcher,
    base_url: String,
    subreddits: Vec<String>,
    /// Web search kicks in when the API found at most this many posts.
    web_search_threshold: usize,
    links: LinkExtractor,
}

impl RedditSource {
    pub fn new(http: HttpFetcher) -> Result<Self> {
        Ok(Self {
            http,
            base_url: REDDIT_BASE.to_string(),
            subreddits: RELEVANT_SUBREDDITS.iter().map(|s| s.to_string()).collect(),
            web_search_threshold: 65,
            links: LinkExtractor::new()?,
        })
    }

    async fn listing_search(
        &self,
        url: &str,
        query: &str,
        params: &[(&str, String)],
        wanted: usize,
        require_mention: bool,
        seen: &mut HashSet<String>,
    ) -> Vec<Post> {
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_SEARCH_PAGES {
            if posts.len() >= wanted {
                break;
            }
            let mut query_params: Vec<(&str, String)> = vec![
                ("q", query.to_string()),
                ("sort", "relevance".to_string()),
                ("t", "all".to_string()),
                ("limit", (wanted - posts.len()).min(100).to_string()),
            ];
            query_params.extend(params.iter().cloned());
            if let Some(cursor) = &after {
                query_params.push(("after", cursor.clone()));
            }

            let payload = match self.http.get_json(url, &query_params).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(url, query, error = %e, "Reddit search request failed");
                    break;
                }
            };

            let (page, next) = parse_listing(&payload);
            if page.is_empty() {
                break;
            }
            for post in page {
                if require_mention && !mentions(&[post.title.as_str(), post.selftext.as_str()], query) {
                    continue;
                }
                if !seen.insert(post.id.clone()) {
                    continue;
                }
                posts.push(post);
                if posts.len() >= wanted {
                    break;
                }
            }

            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        posts
    }

    async fn web_search_fallback(&self, query: &str, seen: &mut HashSet<String>, wanted: usize) -> Vec<Post> {
        let mut ids = Vec::new();
        for variant in [
            format!("{query} reddit"),
            format!("site:reddit.com {query}"),
            format!("reddit.com {query}"),
        ] {
            if ids.len() >= wanted * 2 {
                break;
            }
            match self.http.get_text(WEB_SEARCH_URL, &[("q", variant.clone())]).await {
                Ok(html) => {
                    for id in self.links.post_ids(&html) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
                Err(e) => warn!(query = %variant, error = %e, "Web search failed"),
            }
        }
        info!(query, candidates = ids.len(), "Web search candidates");

        let mut posts = Vec::new();
        for id in ids.into_iter().take(wanted * 3) {
            if posts.len() >= wanted {
                break;
            }
            if seen.contains(&id) {
                continue;
            }
            let url = format!("{}/api/info.json", self.base_url);
            match self.http.get_json(&url, &[("id", format!("t3_{id}"))]).await {
                Ok(payload) => {
                    if let Some(post) = parse_listing(&payload).0.into_iter().next() {
                        seen.insert(post.id.clone());
                        posts.push(post);
                    }
                }
                Err(e) => warn!(post_id = %id, error = %e, "Post lookup failed"),
            }
        }
        posts
    }
}

#[async_trait]
impl Source for RedditSource {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn search(&self, query: &str, max_posts: usize) -> Result<Vec<Post>> {
        let mut seen = HashSet::new();
        let search_url = format!("{}/search.json", self.base_url);

        let mut posts = self
            .listing_search(&search_url, query, &[], max_posts, true, &mut seen)
            .await;
        info!(query, found = posts.len(), strategy = "basic", "Reddit search");

        if posts.len() < max_posts {
            let title_query = format!("title:{query}");
            let extra = self
                .listing_search(&search_url, &title_query, &[], max_posts - posts.len(), false, &mut seen)
                .await;
            info!(query, found = extra.len(), strategy = "title", "Reddit search");
            posts.extend(extra);
        }

        if posts.len() < max_posts && !self.subreddits.is_empty() {
            let per_sub = (max_posts / self.subreddits.len()).max(5);
            let restrict = [("restrict_sr", "true".to_string())];
            let mut found = 0;
            for sub in &self.subreddits {
                if posts.len() >= max_posts {
                    break;
                }
                let url = format!("{}/r/{}/search.json", self.base_url, sub);
                let wanted = per_sub.min(max_posts - posts.len());
                let extra = self.listing_search(&url, query, &restrict, wanted, true, &mut seen).await;
                found += extra.len();
                posts.extend(extra);
            }
            info!(query, found, strategy = "subreddits", "Reddit search");
        }

        if posts.len() <= self.web_search_threshold && posts.len() < max_posts {
            let extra = self
                .web_search_fallback(query, &mut seen, max_posts - posts.len())
                .await;
            info!(query, found = extra.len(), strategy = "web", "Reddit search");
            posts.extend(extra);
        }

        Ok(posts)
    }

    async fn comments(&self, post: &Post) -> Result<Vec<Comment>> {
        let url = format!("{}/comments/{}.json", self.base_url, post.id);
        let params = [("limit", "100".to_string()), ("depth", MAX_COMMENT_DEPTH.to_string())];
        match self.http.get_json(&url, &params).await {
            Ok(payload) => Ok(parse_comments(&payload, &post.id)),
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "Failed to fetch comments");
                Ok(Vec::new())
            }
        }
    }
}

/// Reddit numbers arrive as ints, floats or occasionally strings.
fn lossy_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    }
}

fn str_field(data: &Value, key: &str) -> String {
    data.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn post_from_data(data: &Value) -> Option<Post> {
    let id = data.get("id").and_then(Value::as_str).filter(|s| !s.is_empty())?;
    Some(Post {
        id: id.to_string(),
        subreddit: str_field(data, "subreddit"),
        title: str_field(data, "title"),
        selftext: str_field(data, "selftext"),
        author: data.get("author").and_then(Value::as_str).map(str::to_string),
        url: str_field(data, "url"),
        permalink: str_field(data, "permalink"),
        created_utc: lossy_i64(data.get("created_utc")),
        score: lossy_i64(data.get("score")),
        num_comments: lossy_i64(data.get("num_comments")),
        over_18: data.get("over_18").and_then(Value::as_bool).unwrap_or(false),
        is_self: data.get("is_self").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Posts (`t3` children) of a listing plus the `after` cursor.
pub fn parse_listing(payload: &Value) -> (Vec<Post>, Option<String>) {
    let data = payload.get("data");
    let posts = data
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter(|c| c.get("kind").and_then(Value::as_str) == Some("t3"))
                .filter_map(|c| c.get("data").and_then(post_from_data))
                .collect()
        })
        .unwrap_or_default();
    let after = data
        .and_then(|d| d.get("after"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    (posts, after)
}

/// Comments from a `/comments/<id>.json` response, depth-first, `more`
/// stubs ignored.
pub fn parse_comments(payload: &Value, post_id: &str) -> Vec<Comment> {
    let mut out = Vec::new();
    let children = payload
        .as_array()
        .and_then(|listings| listings.get(1))
        .and_then(|l| l.get("data"))
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array);
    if let Some(children) = children {
        for child in children {
            collect_comment(child, post_id, 0, &mut out);
        }
    }
    out
}

fn collect_comment(node: &Value, post_id: &str, depth: u32, out: &mut Vec<Comment>) {
    let kind = node.get("kind").and_then(Value::as_str).unwrap_or_default();
    if kind == "more" {
        return;
    }
    let Some(data) = node.get("data") else {
        return;
    };

    if kind == "t1" {
        let Some(id) = data.get("id").and_then(Value::as_str).filter(|s| !s.is_empty()) else {
            return;
        };
        out.push(Comment {
            id: id.to_string(),
            post_id: post_id.to_string(),
            parent_id: data.get("parent_id").and_then(Value::as_str).map(str::to_string),
            author: data.get("author").and_then(Value::as_str).map(str::to_string),
            body: str_field(data, "body"),
            created_utc: lossy_i64(data.get("created_utc")),
            score: lossy_i64(data.get("score")),
            depth,
        });
    }

    if depth >= MAX_COMMENT_DEPTH {
        return;
    }
    let replies = data
        .get("replies")
        .and_then(|r| r.get("data"))
        .and_then(|d| d.get("children"))
        .and_then(Value::as_array);
    if let Some(replies) = replies {
        for reply in replies {
            collect_comment(reply, post_id, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_listing() {
        let payload = json!({
            "data": {
                "after": "t3_next",
                "children": [
                    {"kind": "t3", "data": {"id": "abc", "subreddit": "adops", "title": "Taboola payouts",
                        "selftext": "", "author": "pub1", "created_utc": 1704067200.0, "score": "12",
                        "num_comments": 3, "is_self": true}},
                    {"kind": "t5", "data": {"id": "sub"}},
                    {"kind": "t3", "data": {"title": "no id"}}
                ]
            }
        });
        let (posts, after) = parse_listing(&payload);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].created_utc, 1_704_067_200);
        assert_eq!(posts[0].score, 12);
        assert!(posts[0].is_self);
        assert_eq!(after.as_deref(), Some("t3_next"));
    }

    #[test]
    fn test_parse_comments_nested_and_more() {
        let payload = json!([
            {"data": {"children": []}},
            {"data": {"children": [
                {"kind": "t1", "data": {"id": "c1", "body": "top", "score": 5, "parent_id": "t3_p",
                    "replies": {"data": {"children": [
                        {"kind": "t1", "data": {"id": "c2", "body": "reply", "replies": ""}},
                        {"kind": "more", "data": {"children": ["c9"]}}
                    ]}}}},
                {"kind": "t1", "data": {"id": "c3", "body": "second"}}
            ]}}
        ]);
        let comments = parse_comments(&payload, "p");
        let ids: Vec<_> = comments.iter().map(|c| (c.id.as_str(), c.depth)).collect();
        assert_eq!(ids, vec![("c1", 0), ("c2", 1), ("c3", 0)]);
        assert_eq!(comments[1].post_id, "p");
    }

    #[test]
    fn test_comment_depth_is_capped() {
        let mut node = json!({"kind": "t1", "data": {"id": "d5", "body": "deep"}});
        for depth in (0..5).rev() {
            node = json!({"kind": "t1", "data": {"id": format!("d{depth}"), "body": "x",
                "replies": {"data": {"children": [node]}}}});
        }
        let payload = json!([{}, {"data": {"children": [node]}}]);
        let comments = parse_comments(&payload, "p");
        assert_eq!(comments.len(), 5);
        assert_eq!(comments.last().unwrap().depth, MAX_COMMENT_DEPTH);
    }

    #[test]
    fn test_link_extractor_handles_encoded_redirects() {
        let html = r#"
            <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.reddit.com%2Fr%2Fadops%2Fcomments%2F1abcde%2Ftaboola%2F">x</a>
            <a href="https://www.reddit.com/r/PPC/comments/xyz12/taboola_rates/">y</a>
            <a href="https://www.reddit.com/r/PPC/comments/xyz12/taboola_rates/?sort=new">dup</a>
            <a href="https://example.com/comments/nope">z</a>
        "#;
        let ids = LinkExtractor::new().unwrap().post_ids(html);
        assert_eq!(ids, vec!["1abcde", "xyz12"]);
    }
}
