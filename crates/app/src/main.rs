use anyhow::Result;
use app::cli::{Cli, Command};
use app::pipeline::{AnalyzeOptions, print_summary, spawn_cancel_triggers};
use app::telemetry::{self, LogFormat};
use app::{AppConfig, ConfigError, run_aggregate, run_analyze, run_ingest};
use clap::Parser;
use sentiment::CancelFlag;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();
    telemetry::init(LogFormat::from_env());

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            error!("Configuration error: {e:#}");
            eprintln!("ERROR: {e:#}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("Run failed: {e:#}");
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest(args) => {
            let config = AppConfig::from_env()?;
            config.validate()?;
            let client = llm::build_client(&config.llm).map_err(|e| ConfigError::Constraint(e.to_string()))?;
            run_ingest(&args, &config, client).await?;
        }
        Command::Analyze(args) => {
            let mut config = AppConfig::from_env_with_provider(args.provider)?;
            if let Some(key) = args.api_key {
                config.llm.api_key = Some(key);
            }
            if let Some(model) = args.model {
                config.llm.model = model;
            }
            if args.test {
                config.use_offline();
            }
            config.validate()?;
            let client = llm::build_client(&config.llm).map_err(|e| ConfigError::Constraint(e.to_string()))?;

            let cancel = CancelFlag::new();
            spawn_cancel_triggers(&cancel, config.analysis.run_timeout_secs);

            let options = AnalyzeOptions {
                input: args.input,
                output_dir: args.output_dir,
                limit: args.limit,
            };
            let summary = run_analyze(&options, &config, client, &cancel).await?;
            print_summary(&summary);
        }
        Command::Aggregate(args) => {
            let config = AppConfig::from_env()?;
            let written = run_aggregate(&args.root, args.recompute, &config).await?;
            for path in &written {
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}
