use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::document::IngestionDocument;

impl IngestionDocument {
    /// Load an ingestion document. Missing ids are filled in so every item
    /// has a usable identity downstream.
    pub async fn read(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if extension != "json" {
            anyhow::bail!("Unsupported input format: {:?} (expected .json)", path);
        }

        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read input file: {:?}", path))?;
        let mut document: IngestionDocument = serde_json::from_str(&content)
            .context(format!("Input file is not a valid ingestion document: {:?}", path))?;

        let filled = document.fill_missing_ids();
        info!(
            path = %path.display(),
            threads = document.posts.len(),
            filled_ids = filled,
            "Loaded ingestion document"
        );
        Ok(document)
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .await
            .context(format!("Failed to write ingestion document: {:?}", path))?;
        info!(path = %path.display(), threads = self.posts.len(), "Wrote ingestion document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Post, RelevanceVerdict, Thread};

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("posts.json");

        let post = Post {
            id: "abc".into(),
            subreddit: "adops".into(),
            title: "Taboola Realize review".into(),
            ..Default::default()
        };
        let doc = IngestionDocument::new(
            "reddit",
            vec!["Taboola".into()],
            50,
            vec![Thread::new(post, Vec::new(), RelevanceVerdict::default())],
        );
        doc.write(&path).await.unwrap();

        let loaded = IngestionDocument::read(&path).await.unwrap();
        assert_eq!(loaded.posts.len(), 1);
        assert_eq!(loaded.metadata.source, "reddit");
        assert_eq!(loaded.posts[0].post.title, "Taboola Realize review");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IngestionDocument::read(&dir.path().join("absent.json")).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(IngestionDocument::read(&path).await.is_err());
    }
}
