use chrono::DateTime;
use sentiment::{Field, Sentiment, SentimentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::distribution::{SentimentDistribution, qualifying};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTrend {
    pub mentions: usize,
    #[serde(flatten)]
    pub distribution: SentimentDistribution,
}

/// One calendar month (UTC) of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM`
    pub period: String,
    pub total_items: usize,
    pub avg_score: f64,
    pub overall: SentimentDistribution,
    /// Only fields with qualifying mentions that month.
    pub fields: BTreeMap<Field, FieldTrend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendScope {
    Overall,
    Field(Field),
}

/// `YYYY-MM` for a positive unix timestamp. Non-positive timestamps mean
/// the item is undated.
pub fn month_key(created_utc: i64) -> Option<String> {
    if created_utc <= 0 {
        return None;
    }
    DateTime::from_timestamp(created_utc, 0).map(|dt| dt.format("%Y-%m").to_string())
}

/// Every month with at least one dated item, ascending.
pub fn monthly_trends(results: &[SentimentResult]) -> Vec<TrendPoint> {
    let mut months: BTreeMap<String, Vec<&SentimentResult>> = BTreeMap::new();
    for result in results {
        if let Some(key) = month_key(result.metadata.created_utc) {
            months.entry(key).or_default().push(result);
        }
    }

    months
        .into_iter()
        .map(|(period, items)| {
            let total_items = items.len();
            let avg_score = items.iter().map(|r| r.metadata.score as f64).sum::<f64>() / total_items as f64;
            let (overall, _) = SentimentDistribution::from_sentiments(items.iter().map(|r| r.analysis.overall_sentiment));

            let fields = Field::ALL
                .into_iter()
                .filter_map(|field| {
                    let (distribution, mentions) =
                        SentimentDistribution::from_sentiments(items.iter().filter_map(|r| qualifying(r, field)));
                    (mentions > 0).then_some((field, FieldTrend { mentions, distribution }))
                })
                .collect();

            TrendPoint { period, total_items, avg_score, overall, fields }
        })
        .collect()
}

pub fn trend(results: &[SentimentResult], scope: TrendScope) -> Vec<TrendPoint> {
    let points = monthly_trends(results);
    match scope {
        TrendScope::Overall => points,
        TrendScope::Field(field) => points
            .into_iter()
            .filter(|p| p.fields.contains_key(&field))
            .collect(),
    }
}

pub fn csv_header() -> Vec<String> {
    let mut header: Vec<String> = [
        "period",
        "total_items",
        "avg_score",
        "overall_positive_pct",
        "overall_neutral_pct",
        "overall_negative_pct",
        "overall_mixed_pct",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for field in Field::ALL {
        header.push(format!("{field}_mentions"));
        for s in Sentiment::ALL {
            header.push(format!("{field}_{s}_pct"));
        }
    }
    header
}

/// One CSV row, aligned with [`csv_header`]. Fields absent that month are
/// empty cells.
pub fn csv_row(point: &TrendPoint) -> Vec<String> {
    let pct = |v: f64| format!("{v:.2}");
    let mut row = vec![
        point.period.clone(),
        point.total_items.to_string(),
        pct(point.avg_score),
    ];
    row.extend(Sentiment::ALL.into_iter().map(|s| pct(point.overall.get(s))));
    for field in Field::ALL {
        match point.fields.get(&field) {
            Some(ft) => {
                row.push(ft.mentions.to_string());
                row.extend(Sentiment::ALL.into_iter().map(|s| pct(ft.distribution.get(s))));
            }
            None => row.extend(std::iter::repeat_n(String::new(), 5)),
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::tests::result;

    // 2024-01-15 and 2024-03-02, UTC
    const JAN: i64 = 1_705_320_000;
    const MAR: i64 = 1_709_380_800;

    #[test]
    fn test_month_key() {
        assert_eq!(month_key(JAN).as_deref(), Some("2024-01"));
        assert_eq!(month_key(0), None);
        assert_eq!(month_key(-5), None);
    }

    #[test]
    fn test_groups_by_month_and_skips_undated() {
        let mut a = result("a", MAR, Sentiment::Positive, &[(Field::ProductQuality, Sentiment::Positive, 0.9)]);
        a.metadata.score = 10;
        let mut b = result("b", JAN, Sentiment::Negative, &[]);
        b.metadata.score = 2;
        let mut c = result("c", JAN + 3600, Sentiment::Positive, &[]);
        c.metadata.score = 4;
        let undated = result("d", 0, Sentiment::Mixed, &[]);

        let points = monthly_trends(&[a, b, c, undated]);
        let periods: Vec<_> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-03"]);

        let jan = &points[0];
        assert_eq!(jan.total_items, 2);
        assert!((jan.avg_score - 3.0).abs() < 1e-9);
        assert_eq!(jan.overall.positive, 50.0);
        assert!(jan.fields.is_empty());

        let mar = &points[1];
        assert_eq!(mar.fields[&Field::ProductQuality].mentions, 1);
    }

    #[test]
    fn test_field_scope_keeps_months_with_mentions() {
        let results = vec![
            result("a", JAN, Sentiment::Neutral, &[(Field::UserExperience, Sentiment::Negative, 0.7)]),
            result("b", MAR, Sentiment::Neutral, &[(Field::UserExperience, Sentiment::Negative, 0.3)]),
        ];
        let overall = trend(&results, TrendScope::Overall);
        assert_eq!(overall.len(), 2);
        let ux = trend(&results, TrendScope::Field(Field::UserExperience));
        assert_eq!(ux.len(), 1);
        assert_eq!(ux[0].period, "2024-01");
    }

    #[test]
    fn test_csv_row_leaves_absent_fields_empty() {
        let results = vec![result("a", JAN, Sentiment::Positive, &[(Field::ProductQuality, Sentiment::Positive, 0.9)])];
        let points = monthly_trends(&results);
        let row = csv_row(&points[0]);
        let header = csv_header();
        assert_eq!(row.len(), header.len());
        assert_eq!(header.len(), 7 + 6 * 5);
        assert_eq!(row[0], "2024-01");
        assert_eq!(row[3], "100.00");
        // product_quality comes first, user_experience right after it
        assert_eq!(row[7], "1");
        assert_eq!(row[12], "");
    }

    #[test]
    fn test_no_dated_items_gives_no_points() {
        assert!(monthly_trends(&[result("a", 0, Sentiment::Neutral, &[])]).is_empty());
    }
}
