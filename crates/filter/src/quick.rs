use ingest::Post;
use serde::{Deserialize, Serialize};

/// The company and product being tracked, lowercased phrase lists derived
/// from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicProfile {
    pub company: String,
    pub product: String,
}

impl Default for TopicProfile {
    fn default() -> Self {
        Self {
            company: "Taboola".to_string(),
            product: "Realize".to_string(),
        }
    }
}

const GENERIC_VERB_PREFIXES: &[&str] = &[
    "i", "just", "didn't", "don't", "never", "finally", "suddenly", "now", "people", "you", "we",
    "they",
];

const CONTEXT_TERMS: &[&str] = &[
    "advertising",
    "ad network",
    "sponsored",
    "native ad",
    "monetize",
    "monetization",
    "revenue",
    "publisher",
    "cpc",
    "cpm",
    "impressions",
    "clicks",
    "outbrain",
    "revcontent",
    "mgid",
    "widget",
    "recommendation",
    "content discovery",
    "banner",
    "display",
    "campaign",
];

const RELEVANT_SUBREDDITS: &[&str] = &[
    "advertising",
    "adops",
    "marketing",
    "digital_marketing",
    "webdev",
    "web_design",
    "blogging",
    "contentcreation",
    "entrepreneur",
    "smallbusiness",
    "ppc",
    "seo",
];

impl TopicProfile {
    pub fn company_lower(&self) -> String {
        self.company.to_lowercase()
    }

    pub fn product_lower(&self) -> String {
        self.product.to_lowercase()
    }

    /// Everyday uses of the product name as a verb ("i realized").
    fn generic_phrases(&self) -> Vec<String> {
        let product = self.product_lower();
        GENERIC_VERB_PREFIXES
            .iter()
            .map(|prefix| format!("{prefix} {product}"))
            .collect()
    }

    fn strong_indicators(&self) -> Vec<String> {
        let c = self.company_lower();
        let p = self.product_lower();
        vec![
            format!("{c} {p}"),
            format!("{p} by {c}"),
            format!("{c}'s {p}"),
            format!("{c} platform"),
            format!("{c} widget"),
            format!("{c} advertising"),
            format!("{c} ad"),
            format!("{c} sponsored"),
            format!("work at {c}"),
            format!("working for {c}"),
            format!("{c} sucks"),
            format!("{c} spam"),
            format!("block {c}"),
            format!("remove {c}"),
            format!("{c} monetization"),
            format!("{c} revenue"),
        ]
    }
}

/// Result of the heuristic pass over one post.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickVerdict {
    pub keep: bool,
    pub confidence: f64,
    pub reason: String,
}

impl QuickVerdict {
    fn keep(confidence: f64, reason: impl Into<String>) -> Self {
        Self { keep: true, confidence, reason: reason.into() }
    }

    fn reject(confidence: f64, reason: impl Into<String>) -> Self {
        Self { keep: false, confidence, reason: reason.into() }
    }
}

/// Cheap keyword screen that runs before any LLM call. Posts scoring at or
/// above `auto_accept_threshold` are accepted without verification.
#[derive(Debug, Clone)]
pub struct QuickFilter {
    company: String,
    generic_phrases: Vec<String>,
    strong_indicators: Vec<String>,
    auto_accept_threshold: f64,
}

impl QuickFilter {
    pub fn new(profile: &TopicProfile, auto_accept_threshold: f64) -> Self {
        Self {
            company: profile.company_lower(),
            generic_phrases: profile.generic_phrases(),
            strong_indicators: profile.strong_indicators(),
            auto_accept_threshold,
        }
    }

    pub fn auto_accepts(&self, verdict: &QuickVerdict) -> bool {
        verdict.keep && verdict.confidence >= self.auto_accept_threshold
    }

    pub fn check(&self, post: &Post) -> QuickVerdict {
        let content = format!("{} {}", post.title, post.selftext).to_lowercase();

        if !content.contains(&self.company) {
            return QuickVerdict::reject(0.0, format!("No {} mention", self.company));
        }

        if let Some(phrase) = self.generic_phrases.iter().find(|p| content.contains(p.as_str())) {
            return QuickVerdict::reject(0.1, format!("Generic phrase: {phrase}"));
        }

        if let Some(indicator) = self.strong_indicators.iter().find(|i| content.contains(i.as_str())) {
            return QuickVerdict::keep(0.95, format!("Strong indicator: {indicator}"));
        }

        let context = CONTEXT_TERMS.iter().filter(|t| content.contains(*t)).count();
        match context {
            n if n >= 3 => return QuickVerdict::keep(0.85, format!("Strong context ({n} relevant terms)")),
            2 => return QuickVerdict::keep(0.65, "Medium context (2 relevant terms)"),
            1 => return QuickVerdict::keep(0.45, "Weak context (1 relevant term)"),
            _ => {}
        }

        let subreddit = post.subreddit.to_lowercase();
        if RELEVANT_SUBREDDITS.contains(&subreddit.as_str()) {
            return QuickVerdict::keep(0.6, format!("Relevant subreddit: r/{}", post.subreddit));
        }

        if content.chars().count() > 150 {
            return QuickVerdict::keep(0.4, format!("{} mentioned with substantial content", self.company));
        }

        QuickVerdict::reject(0.2, "Insufficient relevance signals")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(subreddit: &str, title: &str, body: &str) -> Post {
        Post {
            id: "p".into(),
            subreddit: subreddit.into(),
            title: title.into(),
            selftext: body.into(),
            ..Default::default()
        }
    }

    fn filter() -> QuickFilter {
        QuickFilter::new(&TopicProfile::default(), 0.8)
    }

    #[test]
    fn test_requires_company_mention() {
        let verdict = filter().check(&post("adops", "Outbrain payouts", "CPM dropped"));
        assert!(!verdict.keep);
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn test_rejects_generic_verb_use() {
        let verdict = filter().check(&post("news", "I realized Taboola owns that site", ""));
        assert!(!verdict.keep);
        assert!(verdict.reason.starts_with("Generic phrase"));
    }

    #[test]
    fn test_strong_indicator_is_auto_accepted() {
        let f = filter();
        let verdict = f.check(&post("random", "Thoughts on Taboola Realize?", ""));
        assert!(verdict.keep);
        assert_eq!(verdict.confidence, 0.95);
        assert!(f.auto_accepts(&verdict));
    }

    #[test]
    fn test_context_scoring() {
        let f = filter();
        let three = f.check(&post("x", "Taboola", "publisher revenue and cpm are down"));
        assert_eq!(three.confidence, 0.85);
        let two = f.check(&post("x", "Taboola", "publisher revenue"));
        assert_eq!(two.confidence, 0.65);
        assert!(!f.auto_accepts(&two));
        let one = f.check(&post("x", "Taboola", "the revenue"));
        assert_eq!(one.confidence, 0.45);
    }

    #[test]
    fn test_subreddit_and_length_fallbacks() {
        let f = filter();
        assert_eq!(f.check(&post("AdOps", "Taboola?", "")).confidence, 0.6);
        let long = "a".repeat(160);
        assert_eq!(f.check(&post("misc", "Taboola", &long)).confidence, 0.4);
        let short = f.check(&post("misc", "Taboola", "hmm"));
        assert!(!short.keep);
        assert_eq!(short.confidence, 0.2);
    }
}
