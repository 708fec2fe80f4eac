//! Derived views over a run's sentiment results: distributions, monthly
//! trends, top themes and the summary report, and the files the dashboard
//! reads them from. Everything is recomputed from scratch on each run.

pub mod distribution;
pub mod export;
pub mod report;
pub mod themes;
pub mod trends;

use sentiment::{Field, MetricsSnapshot, SentimentResult};
use std::collections::BTreeMap;

pub use distribution::{
    CONFIDENCE_THRESHOLD, FieldDistribution, SentimentDistribution, field_distributions, overall_distribution,
};
pub use export::{DashboardBundle, rebuild_bundles, recompute, write_bundle, write_outputs};
pub use report::{DateRange, EdgeCaseTotals, LanguageCount, Overview, SummaryReport, ThemeSummary};
pub use themes::{Quote, ThemeConfig, TopTheme, top_themes};
pub use trends::{FieldTrend, TrendPoint, TrendScope, monthly_trends, trend};

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub report: SummaryReport,
    pub trends: Vec<TrendPoint>,
    pub top_themes: BTreeMap<Field, Vec<TopTheme>>,
}

impl Aggregation {
    pub fn compute(results: &[SentimentResult], processing: MetricsSnapshot, themes: &ThemeConfig) -> Self {
        let top_themes = top_themes(results, themes);
        let report = SummaryReport::build(
            results,
            processing,
            overall_distribution(results),
            field_distributions(results),
            &top_themes,
        );
        Self {
            report,
            trends: monthly_trends(results),
            top_themes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::tests::result;
    use sentiment::Sentiment;

    #[test]
    fn test_zero_results_degrade_to_defaults() {
        let aggregation = Aggregation::compute(&[], MetricsSnapshot::default(), &ThemeConfig::default());
        assert!(aggregation.trends.is_empty());
        assert_eq!(aggregation.report.field_distributions.len(), 6);
        assert!(aggregation.report.field_distributions.iter().all(|d| d.total_mentions == 0));
        assert_eq!(aggregation.report.overall_sentiment_distribution, SentimentDistribution::default());
    }

    #[test]
    fn test_compute_is_consistent() {
        let results = vec![
            result("a", 1_705_320_000, Sentiment::Positive, &[(Field::ProductQuality, Sentiment::Positive, 0.9)]),
            result("b", 1_705_320_000, Sentiment::Negative, &[(Field::ProductQuality, Sentiment::Negative, 0.9)]),
        ];
        let aggregation = Aggregation::compute(&results, MetricsSnapshot::default(), &ThemeConfig::default());
        assert_eq!(aggregation.report.summary.total_items, 2);
        assert_eq!(aggregation.trends.len(), 1);
        assert_eq!(aggregation.trends[0].fields[&Field::ProductQuality].mentions, 2);
        assert_eq!(aggregation.report.field_distributions[0].distribution.positive, 50.0);
    }
}
