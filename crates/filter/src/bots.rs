use ingest::RawItem;
use std::collections::HashSet;

const KNOWN_BOTS: &[&str] = &[
    "automoderator",
    "autotldr",
    "remindmebot",
    "savevideo",
    "sneakpeekbot",
    "repostsleuthbot",
    "converter-bot",
    "wikitextbot",
];

const BOT_SUFFIXES: &[&str] = &["_bot", "-bot"];

const BOT_MARKERS: &[&str] = &[
    "i am a bot",
    "i'm a bot",
    "this action was performed automatically",
];

/// Flags automated accounts by author name and by the boilerplate they
/// append to their messages.
#[derive(Debug, Clone)]
pub struct BotDetector {
    names: HashSet<String>,
}

impl Default for BotDetector {
    fn default() -> Self {
        Self {
            names: KNOWN_BOTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BotDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bot(&self, item: &RawItem) -> bool {
        let raw = item.meta.author.trim();
        let author = raw.to_lowercase();
        if !author.is_empty() {
            if self.names.contains(&author) {
                return true;
            }
            if BOT_SUFFIXES.iter().any(|s| author.ends_with(s)) || camel_case_bot(raw) {
                return true;
            }
        }

        let text = item.text.to_lowercase();
        BOT_MARKERS.iter().any(|m| text.contains(m))
    }
}

/// `SummarizerBot`, but not `Talbot` or `TALBOT`.
fn camel_case_bot(name: &str) -> bool {
    name.strip_suffix("Bot")
        .and_then(|stem| stem.chars().last())
        .is_some_and(|c| c.is_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::{ItemKind, ItemMetadata};

    fn item(author: &str, text: &str) -> RawItem {
        RawItem {
            meta: ItemMetadata {
                id: "1".into(),
                kind: ItemKind::Comment,
                source: "adops".into(),
                author: author.into(),
                created_utc: 0,
                score: 0,
                num_comments: 0,
                url: String::new(),
                post_id: None,
                depth: 0,
            },
            text: text.into(),
        }
    }

    #[test]
    fn test_known_names_and_suffixes() {
        let detector = BotDetector::new();
        assert!(detector.is_bot(&item("AutoModerator", "Your post was removed")));
        assert!(detector.is_bot(&item("price_tracker_bot", "Price dropped")));
        assert!(detector.is_bot(&item("Some-Bot", "hello")));
        assert!(!detector.is_bot(&item("abbott", "Taboola paid late again")));
        assert!(detector.is_bot(&item("WikiSummarizerBot", "Here is a summary")));
    }

    #[test]
    fn test_names_merely_ending_in_bot_are_people() {
        let detector = BotDetector::new();
        assert!(!detector.is_bot(&item("talbot", "Realize CPCs look fine to me")));
        assert!(!detector.is_bot(&item("Abbot", "Switched from Outbrain last year")));
        assert!(!detector.is_bot(&item("TALBOT", "Same here")));
    }

    #[test]
    fn test_text_markers() {
        let detector = BotDetector::new();
        assert!(detector.is_bot(&item(
            "helper",
            "Summary below. I am a bot, and this action was performed automatically."
        )));
        assert!(!detector.is_bot(&item("", "A perfectly human comment about ads")));
    }
}
