pub mod hackernews;
pub mod reddit;
pub mod synthetic;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::info;

use crate::document::{Comment, Post};

pub use hackernews::{HackerNewsSettings, HackerNewsSource};
pub use reddit::RedditSource;
pub use synthetic::SyntheticSource;

/// A platform that can be searched for posts and asked for a post's comments.
///
/// Implementations log and swallow failed requests; an error return means
/// the source as a whole is unusable.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_posts: usize) -> Result<Vec<Post>>;

    async fn comments(&self, post: &Post) -> Result<Vec<Comment>>;
}

/// Run every query and merge the results, keeping the first occurrence of
/// each post id.
pub async fn collect_posts(
    source: &dyn Source,
    queries: &[String],
    max_posts_per_query: usize,
) -> Result<Vec<Post>> {
    let mut seen = HashSet::new();
    let mut posts = Vec::new();

    for query in queries {
        let found = source.search(query, max_posts_per_query).await?;
        let total = found.len();
        let mut added = 0;
        for post in found {
            if seen.insert(post.id.clone()) {
                posts.push(post);
                added += 1;
            }
        }
        info!(source = source.name(), query = %query, found = total, new = added, "Query complete");
    }

    info!(source = source.name(), unique_posts = posts.len(), "Collected posts");
    Ok(posts)
}

/// Case-insensitive containment used by every source to drop search hits
/// that do not actually mention the query.
pub(crate) fn mentions(haystacks: &[&str], query: &str) -> bool {
    let needle = query.to_lowercase();
    haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource;

    fn post(id: &str) -> Post {
        Post { id: id.into(), title: format!("post {id}"), ..Default::default() }
    }

    #[async_trait]
    impl Source for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(&self, query: &str, _max_posts: usize) -> Result<Vec<Post>> {
            Ok(match query {
                "a" => vec![post("1"), post("2")],
                _ => vec![post("2"), post("3")],
            })
        }

        async fn comments(&self, _post: &Post) -> Result<Vec<Comment>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_collect_dedups_across_queries() {
        let posts = collect_posts(&FixedSource, &["a".into(), "b".into()], 10)
            .await
            .unwrap();
        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_mentions_is_case_insensitive() {
        assert!(mentions(&["Loving TABOOLA widgets", ""], "taboola"));
        assert!(!mentions(&["outbrain"], "taboola"));
    }
}
