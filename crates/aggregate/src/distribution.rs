use sentiment::{Field, Sentiment, SentimentResult};
use serde::{Deserialize, Serialize};

/// A field counts as mentioned only above this confidence.
pub const CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Percentages over the four sentiment categories. All zero when nothing
/// was counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
    pub mixed: f64,
}

impl SentimentDistribution {
    pub fn from_sentiments<I>(sentiments: I) -> (Self, usize)
    where
        I: IntoIterator<Item = Sentiment>,
    {
        let mut counts = [0usize; 4];
        for s in sentiments {
            counts[Self::slot(s)] += 1;
        }
        let total: usize = counts.iter().sum();
        if total == 0 {
            return (Self::default(), 0);
        }
        let pct = |n: usize| n as f64 / total as f64 * 100.0;
        (
            Self {
                positive: pct(counts[0]),
                neutral: pct(counts[1]),
                negative: pct(counts[2]),
                mixed: pct(counts[3]),
            },
            total,
        )
    }

    fn slot(s: Sentiment) -> usize {
        match s {
            Sentiment::Positive => 0,
            Sentiment::Neutral => 1,
            Sentiment::Negative => 2,
            Sentiment::Mixed => 3,
        }
    }

    pub fn get(&self, s: Sentiment) -> f64 {
        match s {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
            Sentiment::Mixed => self.mixed,
        }
    }

    /// Most frequent category, `None` when empty.
    pub fn dominant(&self) -> Option<(Sentiment, f64)> {
        Sentiment::ALL
            .into_iter()
            .map(|s| (s, self.get(s)))
            .filter(|(_, pct)| *pct > 0.0)
            .fold(None, |best, cur| match best {
                Some((_, p)) if p >= cur.1 => best,
                _ => Some(cur),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDistribution {
    pub field: Field,
    #[serde(flatten)]
    pub distribution: SentimentDistribution,
    pub total_mentions: usize,
}

/// Sentiment of a field in one result, when it clears the threshold.
pub fn qualifying(result: &SentimentResult, field: Field) -> Option<Sentiment> {
    result
        .analysis
        .field(field)
        .filter(|fs| fs.confidence > CONFIDENCE_THRESHOLD)
        .map(|fs| fs.sentiment)
}

/// One entry per field, in field order.
pub fn field_distributions(results: &[SentimentResult]) -> Vec<FieldDistribution> {
    Field::ALL
        .into_iter()
        .map(|field| {
            let (distribution, total_mentions) =
                SentimentDistribution::from_sentiments(results.iter().filter_map(|r| qualifying(r, field)));
            FieldDistribution { field, distribution, total_mentions }
        })
        .collect()
}

pub fn overall_distribution(results: &[SentimentResult]) -> SentimentDistribution {
    SentimentDistribution::from_sentiments(results.iter().map(|r| r.analysis.overall_sentiment)).0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ingest::{ItemKind, ItemMetadata};
    use sentiment::{Analysis, FieldSentiment, Theme};

    pub(crate) fn result(id: &str, created_utc: i64, overall: Sentiment, fields: &[(Field, Sentiment, f64)]) -> SentimentResult {
        let mut analysis = Analysis::empty();
        analysis.overall_sentiment = overall;
        analysis.edge_cases.language = "en".into();
        for (field, sentiment, confidence) in fields {
            analysis.field_sentiments.insert(
                *field,
                FieldSentiment { sentiment: *sentiment, confidence: *confidence, key_phrases: Vec::new() },
            );
        }
        SentimentResult {
            text: format!("text of {id}"),
            context: "post".into(),
            metadata: ItemMetadata {
                id: id.into(),
                kind: ItemKind::Post,
                source: "adops".into(),
                author: "a".into(),
                created_utc,
                score: 1,
                num_comments: 0,
                url: String::new(),
                post_id: None,
                depth: 0,
            },
            analysis,
        }
    }

    pub(crate) fn with_themes(mut r: SentimentResult, themes: &[(&str, f64)]) -> SentimentResult {
        r.analysis.themes = themes
            .iter()
            .map(|(t, rel)| Theme { theme: t.to_string(), relevance: *rel })
            .collect();
        r
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let results = vec![
            result("1", 0, Sentiment::Positive, &[(Field::ProductQuality, Sentiment::Positive, 0.9)]),
            result("2", 0, Sentiment::Negative, &[(Field::ProductQuality, Sentiment::Negative, 0.8)]),
            result("3", 0, Sentiment::Mixed, &[(Field::ProductQuality, Sentiment::Negative, 0.6)]),
        ];
        let dists = field_distributions(&results);
        let pq = &dists[0];
        assert_eq!(pq.field, Field::ProductQuality);
        assert_eq!(pq.total_mentions, 3);
        let d = pq.distribution;
        assert!((d.positive + d.neutral + d.negative + d.mixed - 100.0).abs() < 1e-9);
        assert!((d.negative - 200.0 / 3.0).abs() < 1e-9);

        let overall = overall_distribution(&results);
        assert!((overall.positive + overall.negative + overall.mixed - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_strict() {
        let results = vec![
            result("1", 0, Sentiment::Neutral, &[(Field::AdvertiserValue, Sentiment::Positive, 0.5)]),
            result("2", 0, Sentiment::Neutral, &[(Field::AdvertiserValue, Sentiment::Positive, 0.51)]),
        ];
        let dists = field_distributions(&results);
        assert_eq!(dists[5].total_mentions, 1);
        assert_eq!(dists[5].distribution.positive, 100.0);
    }

    #[test]
    fn test_zero_mentions_is_all_zero() {
        let dists = field_distributions(&[]);
        assert_eq!(dists.len(), 6);
        for d in dists {
            assert_eq!(d.total_mentions, 0);
            assert_eq!(d.distribution, SentimentDistribution::default());
        }
        assert_eq!(overall_distribution(&[]).dominant(), None);
    }

    #[test]
    fn test_flattened_serialization() {
        let d = FieldDistribution {
            field: Field::UserExperience,
            distribution: SentimentDistribution { negative: 100.0, ..Default::default() },
            total_mentions: 1,
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["field"], "user_experience");
        assert_eq!(json["negative"], 100.0);
        assert_eq!(json["total_mentions"], 1);
    }
}
