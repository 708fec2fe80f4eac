use anyhow::{Context, Result};
use sentiment::{Field, SentimentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::Aggregation;
use crate::distribution::{FieldDistribution, SentimentDistribution};
use crate::report::{EdgeCaseTotals, LanguageCount, Overview, SummaryReport, ThemeSummary};
use crate::themes::ThemeConfig;
use crate::trends::{TrendPoint, csv_header, csv_row};

pub const RESULTS_FILE: &str = "sentiment_results.json";
pub const SUMMARY_FILE: &str = "summary_report.json";
pub const FIELD_DISTRIBUTIONS_FILE: &str = "field_distributions.csv";
pub const TRENDS_FILE: &str = "sentiment_trends.csv";
pub const TOP_THEMES_FILE: &str = "top_themes.json";
pub const BUNDLE_FILE: &str = "aggregates.json";

/// Everything the dashboard reads, in one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardBundle {
    pub summary: Overview,
    pub overall_sentiment_distribution: SentimentDistribution,
    pub field_distributions: Vec<FieldDistribution>,
    pub top_themes_by_field: BTreeMap<Field, Vec<ThemeSummary>>,
    /// Rows of `sentiment_trends.csv`, keyed by column name.
    pub trends_over_time: Vec<BTreeMap<String, String>>,
    pub edge_cases: EdgeCaseTotals,
    pub language_distribution: Vec<LanguageCount>,
}

impl DashboardBundle {
    pub fn new(report: SummaryReport, trends_over_time: Vec<BTreeMap<String, String>>) -> Self {
        Self {
            summary: report.summary,
            overall_sentiment_distribution: report.overall_sentiment_distribution,
            field_distributions: report.field_distributions,
            top_themes_by_field: report.top_themes_by_field,
            trends_over_time,
            edge_cases: report.edge_cases,
            language_distribution: report.language_distribution,
        }
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    fs::write(path, body + "\n")
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn to_csv(header: &[String], rows: impl IntoIterator<Item = Vec<String>>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.into_inner().map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))
}

pub fn field_distributions_csv(distributions: &[FieldDistribution]) -> Result<Vec<u8>> {
    let header: Vec<String> = ["field", "positive", "neutral", "negative", "mixed", "total_mentions"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows = distributions.iter().map(|d| {
        vec![
            d.field.to_string(),
            format!("{:.2}", d.distribution.positive),
            format!("{:.2}", d.distribution.neutral),
            format!("{:.2}", d.distribution.negative),
            format!("{:.2}", d.distribution.mixed),
            d.total_mentions.to_string(),
        ]
    });
    to_csv(&header, rows)
}

/// Header-only when there are no points.
pub fn trends_csv(points: &[TrendPoint]) -> Result<Vec<u8>> {
    to_csv(&csv_header(), points.iter().map(csv_row))
}

/// Write the five per-run output files into `dir`, creating it if needed.
pub async fn write_outputs(dir: &Path, results: &[SentimentResult], aggregation: &Aggregation) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    write_json(&dir.join(RESULTS_FILE), results).await?;
    write_json(&dir.join(SUMMARY_FILE), &aggregation.report).await?;
    write_json(&dir.join(TOP_THEMES_FILE), &aggregation.top_themes).await?;

    let distributions = field_distributions_csv(&aggregation.report.field_distributions)?;
    fs::write(dir.join(FIELD_DISTRIBUTIONS_FILE), distributions)
        .await
        .context("Failed to write field distributions")?;

    let trends = trends_csv(&aggregation.trends)?;
    fs::write(dir.join(TRENDS_FILE), trends)
        .await
        .context("Failed to write sentiment trends")?;

    info!(
        dir = %dir.display(),
        results = results.len(),
        months = aggregation.trends.len(),
        "Wrote output files"
    );
    Ok(())
}

pub async fn read_results(dir: &Path) -> Result<Vec<SentimentResult>> {
    let path = dir.join(RESULTS_FILE);
    let body = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("Failed to parse {}", path.display()))
}

pub async fn read_summary(dir: &Path) -> Result<SummaryReport> {
    let path = dir.join(SUMMARY_FILE);
    let body = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Missing summary report: {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Rows of a trends CSV as column → value maps. A missing file is empty.
pub async fn read_trend_rows(path: &Path) -> Result<Vec<BTreeMap<String, String>>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Bad row in {}", path.display()))?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

/// Build `aggregates.json` from the summary and trends files in `dir`.
pub async fn write_bundle(dir: &Path) -> Result<PathBuf> {
    let report = read_summary(dir).await?;
    let trends = read_trend_rows(&dir.join(TRENDS_FILE)).await?;
    let bundle = DashboardBundle::new(report, trends);

    let path = dir.join(BUNDLE_FILE);
    write_json(&path, &bundle).await?;
    info!(path = %path.display(), "Wrote dashboard bundle");
    Ok(path)
}

/// Directories under `root` holding a summary report, sorted.
pub fn find_output_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == SUMMARY_FILE)
        .filter_map(|e| e.path().parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    dirs
}

/// Recompute the derived files of `dir` from its `sentiment_results.json`.
/// Processing counters are carried over from the previous summary when
/// there is one.
pub async fn recompute(dir: &Path, themes: &ThemeConfig) -> Result<Aggregation> {
    let results = read_results(dir).await?;
    let processing = match read_summary(dir).await {
        Ok(previous) => previous.processing,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "No previous summary, processing counters reset");
            Default::default()
        }
    };
    let aggregation = Aggregation::compute(&results, processing, themes);
    write_outputs(dir, &results, &aggregation).await?;
    Ok(aggregation)
}

/// Rebuild the bundle for every output directory under `root`.
pub async fn rebuild_bundles(root: &Path) -> Result<Vec<PathBuf>> {
    let dirs = find_output_dirs(root);
    if dirs.is_empty() {
        warn!(root = %root.display(), "No summary reports found");
    }
    let mut written = Vec::with_capacity(dirs.len());
    for dir in dirs {
        written.push(write_bundle(&dir).await?);
    }
    Ok(written)
}
