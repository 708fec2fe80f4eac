use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Comment,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Post => "post",
            ItemKind::Comment => "comment",
        }
    }
}

/// Everything about an item except its text. Carried through to the
/// sentiment results so the dashboard can link back to the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemMetadata {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Subreddit name, or `hackernews`.
    #[serde(alias = "subreddit")]
    pub source: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_utc: i64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default)]
    pub depth: u32,
}

/// A single analyzable post or comment. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawItem {
    #[serde(flatten)]
    pub meta: ItemMetadata,
    pub text: String,
}

impl RawItem {
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn kind(&self) -> ItemKind {
        self.meta.kind
    }

    /// `post` or `comment`, used in prompts.
    pub fn context(&self) -> &'static str {
        self.meta.kind.as_str()
    }

    /// The item's own URL when it has one, otherwise a platform permalink.
    pub fn link(&self) -> String {
        if !self.meta.url.is_empty() {
            return self.meta.url.clone();
        }
        permalink(&self.meta)
    }
}

pub fn permalink(meta: &ItemMetadata) -> String {
    if meta.source == crate::HACKER_NEWS_SOURCE {
        return format!("https://news.ycombinator.com/item?id={}", meta.id);
    }
    match (&meta.kind, &meta.post_id) {
        (ItemKind::Comment, Some(post_id)) => {
            format!("https://www.reddit.com/comments/{}/_/{}", post_id, meta.id)
        }
        _ => format!("https://www.reddit.com/comments/{}", meta.id),
    }
}

/// Stable id for records that arrive without a platform id.
pub fn stable_id(source: &str, text: &str, created_utc: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(text.as_bytes());
    hasher.update(created_utc.to_string().as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}
