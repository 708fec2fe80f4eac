use ingest::permalink;
use sentiment::{Field, Sentiment, SentimentResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

use crate::distribution::CONFIDENCE_THRESHOLD;

pub const THEME_RELEVANCE_THRESHOLD: f64 = 0.5;
pub const MAX_QUOTE_GRAPHEMES: usize = 200;
pub const QUOTES_PER_THEME: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Items below this score never become quotes.
    pub min_quote_score: i64,
    pub themes_per_field: usize,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            min_quote_score: 1,
            themes_per_field: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub link: String,
    pub sentiment: Sentiment,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTheme {
    pub theme: String,
    pub frequency: usize,
    pub avg_relevance: f64,
    pub representative_quotes: Vec<Quote>,
}

struct Occurrence<'a> {
    relevance: f64,
    sentiment: Sentiment,
    result: &'a SentimentResult,
}

fn truncate_graphemes(text: &str, max: usize) -> String {
    text.graphemes(true).take(max).collect()
}

fn link_for(result: &SentimentResult) -> String {
    if result.metadata.url.is_empty() {
        permalink(&result.metadata)
    } else {
        result.metadata.url.clone()
    }
}

/// Top themes for one field.
pub fn field_themes(results: &[SentimentResult], field: Field, config: &ThemeConfig) -> Vec<TopTheme> {
    let mut groups: HashMap<&str, Vec<Occurrence<'_>>> = HashMap::new();

    for result in results {
        let Some(fs) = result.analysis.field(field) else { continue };
        if fs.confidence <= CONFIDENCE_THRESHOLD {
            continue;
        }
        // A theme repeated within one answer counts once.
        let mut seen = HashSet::new();
        for theme in &result.analysis.themes {
            if theme.relevance > THEME_RELEVANCE_THRESHOLD && seen.insert(theme.theme.as_str()) {
                groups.entry(theme.theme.as_str()).or_default().push(Occurrence {
                    relevance: theme.relevance,
                    sentiment: fs.sentiment,
                    result,
                });
            }
        }
    }

    let mut themes: Vec<TopTheme> = groups
        .into_iter()
        .map(|(name, occurrences)| {
            let frequency = occurrences.len();
            let avg_relevance = occurrences.iter().map(|o| o.relevance).sum::<f64>() / frequency as f64;

            let mut quotable: Vec<&Occurrence<'_>> = occurrences
                .iter()
                .filter(|o| o.result.metadata.score >= config.min_quote_score)
                .collect();
            quotable.sort_by(|a, b| b.result.metadata.score.cmp(&a.result.metadata.score));

            let representative_quotes = quotable
                .into_iter()
                .take(QUOTES_PER_THEME)
                .map(|o| Quote {
                    text: truncate_graphemes(&o.result.text, MAX_QUOTE_GRAPHEMES),
                    link: link_for(o.result),
                    sentiment: o.sentiment,
                    score: o.result.metadata.score,
                })
                .collect();

            TopTheme {
                theme: name.to_string(),
                frequency,
                avg_relevance,
                representative_quotes,
            }
        })
        .collect();

    themes.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| b.avg_relevance.total_cmp(&a.avg_relevance))
            .then_with(|| a.theme.cmp(&b.theme))
    });
    themes.truncate(config.themes_per_field);
    themes
}

/// Every field, even those without themes.
pub fn top_themes(results: &[SentimentResult], config: &ThemeConfig) -> BTreeMap<Field, Vec<TopTheme>> {
    Field::ALL
        .into_iter()
        .map(|field| (field, field_themes(results, field, config)))
        .collect()
}
