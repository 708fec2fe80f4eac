//! Provider-neutral access to the language models used by the pipeline.
//!
//! Everything above this crate talks to a model through [`LlmClient`] only,
//! which keeps the analyzer and the relevance filter testable against canned
//! responses.

pub mod client;
pub mod error;
pub mod gemini;
pub mod json;
pub mod offline;
pub mod openai;
pub mod retry;

pub use client::{LlmClient, LlmSettings, Provider, build_client};
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use json::parse_llm_json;
pub use offline::OfflineClient;
pub use openai::OpenAiClient;
pub use retry::{RetryPolicy, Transient};
