//! Source records and the ingestion document, plus the fetchers that build
//! them from Reddit, Hacker News or a local file.

pub mod document;
pub mod http;
pub mod item;
pub mod reader;
pub mod sources;

/// Value of `subreddit`/`source` for Hacker News records.
pub const HACKER_NEWS_SOURCE: &str = "hackernews";

pub use document::{Comment, DocumentMetadata, IngestionDocument, Post, RelevanceVerdict, Thread};
pub use http::{FetchError, HttpFetcher, HttpSettings};
pub use item::{ItemKind, ItemMetadata, RawItem, permalink, stable_id};
pub use sources::{HackerNewsSettings, HackerNewsSource, RedditSource, Source, SyntheticSource, collect_posts};
