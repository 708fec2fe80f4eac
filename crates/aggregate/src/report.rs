use chrono::{SecondsFormat, Utc};
use ingest::ItemKind;
use sentiment::{Field, MetricsSnapshot, SentimentResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::distribution::{FieldDistribution, SentimentDistribution};
use crate::themes::TopTheme;

pub const TOP_LANGUAGES: usize = 5;
pub const THEMES_IN_SUMMARY: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<i64>,
    pub latest: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_items: usize,
    pub total_posts: usize,
    pub total_comments: usize,
    pub unique_sources: usize,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeCaseTotals {
    pub total_sarcastic: usize,
    pub total_mixed_sentiment: usize,
    pub total_non_english: usize,
    pub total_spam: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageCount {
    pub language: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSummary {
    pub theme: String,
    pub frequency: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub run_id: Uuid,
    pub generated_at: String,
    pub summary: Overview,
    #[serde(default)]
    pub processing: MetricsSnapshot,
    pub overall_sentiment_distribution: SentimentDistribution,
    pub field_distributions: Vec<FieldDistribution>,
    pub edge_cases: EdgeCaseTotals,
    pub language_distribution: Vec<LanguageCount>,
    pub top_themes_by_field: BTreeMap<Field, Vec<ThemeSummary>>,
}

impl SummaryReport {
    pub fn build(
        results: &[SentimentResult],
        processing: MetricsSnapshot,
        overall: SentimentDistribution,
        field_distributions: Vec<FieldDistribution>,
        themes: &BTreeMap<Field, Vec<TopTheme>>,
    ) -> Self {
        let top_themes_by_field = themes
            .iter()
            .map(|(field, list)| {
                let trimmed = list
                    .iter()
                    .take(THEMES_IN_SUMMARY)
                    .map(|t| ThemeSummary { theme: t.theme.clone(), frequency: t.frequency })
                    .collect();
                (*field, trimmed)
            })
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            summary: overview(results),
            processing,
            overall_sentiment_distribution: overall,
            field_distributions,
            edge_cases: edge_case_totals(results),
            language_distribution: language_distribution(results),
            top_themes_by_field,
        }
    }
}

pub fn overview(results: &[SentimentResult]) -> Overview {
    let total_posts = results.iter().filter(|r| r.metadata.kind == ItemKind::Post).count();
    let unique_sources: HashSet<&str> = results.iter().map(|r| r.metadata.source.as_str()).collect();
    let dated = results.iter().map(|r| r.metadata.created_utc).filter(|ts| *ts > 0);

    Overview {
        total_items: results.len(),
        total_posts,
        total_comments: results.len() - total_posts,
        unique_sources: unique_sources.len(),
        date_range: DateRange {
            earliest: dated.clone().min(),
            latest: dated.max(),
        },
    }
}

pub fn edge_case_totals(results: &[SentimentResult]) -> EdgeCaseTotals {
    results.iter().fold(EdgeCaseTotals::default(), |mut acc, r| {
        let e = &r.analysis.edge_cases;
        acc.total_sarcastic += e.is_sarcastic as usize;
        acc.total_mixed_sentiment += e.has_mixed_sentiment as usize;
        acc.total_non_english += e.is_non_english as usize;
        acc.total_spam += e.is_spam as usize;
        acc
    })
}

/// Most common languages first; ties by name.
pub fn language_distribution(results: &[SentimentResult]) -> Vec<LanguageCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in results {
        *counts.entry(r.analysis.edge_cases.language.as_str()).or_default() += 1;
    }
    let mut languages: Vec<LanguageCount> = counts
        .into_iter()
        .map(|(language, count)| LanguageCount { language: language.to_string(), count })
        .collect();
    languages.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.language.cmp(&b.language)));
    languages.truncate(TOP_LANGUAGES);
    languages
}
