//! The `social-pulse` command line: configuration, logging setup and the
//! ingest / analyze / aggregate runs that tie the library crates together.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod telemetry;

pub use config::{AppConfig, ConfigError};
pub use pipeline::{AnalyzeOptions, RunSummary, run_aggregate, run_analyze, run_ingest};
