use clap::{Args, Parser, Subcommand, ValueEnum};
use llm::Provider;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "social-pulse",
    version,
    about = "Social listening pipeline: fetch, filter, classify sentiment, aggregate"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch posts and comments, screen them for relevance, write an ingestion document
    Ingest(IngestArgs),
    /// Classify every item of an ingestion document and write the output files
    Analyze(AnalyzeArgs),
    /// Rebuild dashboard bundles for every output directory under a root
    Aggregate(AggregateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Reddit,
    Hackernews,
    Synthetic,
}

impl SourceKind {
    pub fn default_output(&self) -> PathBuf {
        PathBuf::from(match self {
            SourceKind::Reddit => "reddit_filtered.json",
            SourceKind::Hackernews => "hacker_news_filtered.json",
            SourceKind::Synthetic => "synthetic_filtered.json",
        })
    }
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Reddit)]
    pub source: SourceKind,

    /// Search query, repeatable. Defaults to the company name and
    /// "company product".
    #[arg(long = "query")]
    pub queries: Vec<String>,

    #[arg(long, default_value_t = 200)]
    pub max_posts_per_query: usize,

    /// Ingestion document to read posts from (synthetic source only)
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long)]
    pub output_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Analyze at most this many items after filtering
    #[arg(long)]
    pub limit: Option<usize>,

    /// Override the API key of the configured provider
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub provider: Option<Provider>,

    /// Use the offline client: no network, no API key
    #[arg(long)]
    pub test: bool,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    #[arg(long)]
    pub root: PathBuf,

    /// Recompute derived files from sentiment_results.json first
    #[arg(long)]
    pub recompute: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest() {
        let cli = Cli::try_parse_from([
            "social-pulse",
            "ingest",
            "--source",
            "hackernews",
            "--query",
            "Taboola",
            "--query",
            "Taboola Realize",
            "--max-posts-per-query",
            "50",
        ])
        .unwrap();
        let Command::Ingest(args) = cli.command else { panic!("expected ingest") };
        assert_eq!(args.source, SourceKind::Hackernews);
        assert_eq!(args.queries, vec!["Taboola", "Taboola Realize"]);
        assert_eq!(args.max_posts_per_query, 50);
        assert_eq!(args.source.default_output(), PathBuf::from("hacker_news_filtered.json"));
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "social-pulse",
            "analyze",
            "--input",
            "reddit_filtered.json",
            "--limit",
            "10",
            "--provider",
            "gemini",
            "--test",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else { panic!("expected analyze") };
        assert_eq!(args.limit, Some(10));
        assert_eq!(args.provider, Some(Provider::Gemini));
        assert!(args.test);
        assert!(args.output_dir.is_none());
    }

    #[test]
    fn test_analyze_requires_input() {
        assert!(Cli::try_parse_from(["social-pulse", "analyze"]).is_err());
    }
}
