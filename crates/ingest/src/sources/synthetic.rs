use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use super::{Source, mentions};
use crate::document::{Comment, IngestionDocument, Post};

/// Serves posts and comments from an ingestion document on disk, for
/// offline runs and fixtures.
pub struct SyntheticSource {
    posts: Vec<Post>,
    comments: HashMap<String, Vec<Comment>>,
}

impl SyntheticSource {
    pub async fn load(path: &Path) -> Result<Self> {
        let document = IngestionDocument::read(path).await?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: IngestionDocument) -> Self {
        let mut posts = Vec::with_capacity(document.posts.len());
        let mut comments = HashMap::new();
        for thread in document.posts {
            comments.insert(thread.post.id.clone(), thread.comments);
            posts.push(thread.post);
        }
        Self { posts, comments }
    }
}

#[async_trait]
impl Source for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn search(&self, query: &str, max_posts: usize) -> Result<Vec<Post>> {
        let query = query.trim();
        Ok(self
            .posts
            .iter()
            .filter(|p| query.is_empty() || mentions(&[p.title.as_str(), p.selftext.as_str()], query))
            .take(max_posts)
            .cloned()
            .collect())
    }

    async fn comments(&self, post: &Post) -> Result<Vec<Comment>> {
        Ok(self.comments.get(&post.id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{RelevanceVerdict, Thread};

    fn source() -> SyntheticSource {
        let threads = vec![
            Thread::new(
                Post { id: "1".into(), title: "Taboola Realize launch".into(), ..Default::default() },
                vec![Comment { id: "c1".into(), body: "Interesting".into(), ..Default::default() }],
                RelevanceVerdict::default(),
            ),
            Thread::new(
                Post { id: "2".into(), title: "Outbrain news".into(), ..Default::default() },
                Vec::new(),
                RelevanceVerdict::default(),
            ),
        ];
        SyntheticSource::from_document(IngestionDocument::new("synthetic", Vec::new(), 10, threads))
    }

    #[tokio::test]
    async fn test_search_filters_by_query() {
        let source = source();
        assert_eq!(source.search("realize", 10).await.unwrap().len(), 1);
        assert_eq!(source.search("", 10).await.unwrap().len(), 2);
        assert_eq!(source.search("", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_comments_come_from_the_file() {
        let source = source();
        let post = source.search("taboola", 1).await.unwrap().remove(0);
        assert_eq!(source.comments(&post).await.unwrap()[0].id, "c1");
    }
}
