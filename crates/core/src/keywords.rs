//! Configurable keyword classes.
//!
//! Keyword lists (comparison, decision, analysis, ...) are configuration
//! data. A [`KeywordSet`] compiles one list into a set-membership check:
//! single words match whole tokens, multi-word phrases match by containment
//! in the lowercased text.

use std::collections::HashSet;

use crate::text::tokenize;

/// A compiled keyword class.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    words: HashSet<String>,
    phrases: Vec<String>,
}

impl KeywordSet {
    /// Compile a keyword list. Entries are trimmed and lowercased; blank
    /// entries are ignored.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = HashSet::new();
        let mut phrases = Vec::new();
        for entry in entries {
            let normalized = entry.as_ref().trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            if normalized.contains(char::is_whitespace) {
                if !phrases.contains(&normalized) {
                    phrases.push(normalized);
                }
            } else {
                words.insert(normalized);
            }
        }
        Self { words, phrases }
    }

    pub fn len(&self) -> usize {
        self.words.len() + self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any keyword occurs in the probed text.
    pub fn matches(&self, probe: &TextProbe) -> bool {
        self.phrases.iter().any(|p| probe.lowered.contains(p.as_str()))
            || probe.tokens.iter().any(|t| self.words.contains(t))
    }

    /// The keywords that occur in the probed text, sorted.
    pub fn matched(&self, probe: &TextProbe) -> Vec<String> {
        let mut hits: Vec<String> = self
            .phrases
            .iter()
            .filter(|p| probe.lowered.contains(p.as_str()))
            .cloned()
            .chain(probe.tokens.iter().filter(|t| self.words.contains(*t)).cloned())
            .collect();
        hits.sort();
        hits.dedup();
        hits
    }

    /// Convenience for one-off checks against raw text.
    pub fn matches_text(&self, text: &str) -> bool {
        self.matches(&TextProbe::new(text))
    }
}

/// A text prepared once for repeated keyword checks.
#[derive(Debug, Clone)]
pub struct TextProbe {
    lowered: String,
    tokens: HashSet<String>,
    word_count: usize,
}

impl TextProbe {
    pub fn new(text: &str) -> Self {
        let tokens: Vec<String> = tokenize(text);
        Self {
            lowered: text.to_lowercase(),
            word_count: tokens.len(),
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn lowered(&self) -> &str {
        &self.lowered
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn has_question(&self) -> bool {
        self.lowered.contains('?')
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison() -> KeywordSet {
        KeywordSet::new(["vs", "versus", "or", "compare", "pros and cons", "  "])
    }

    #[test]
    fn words_match_whole_tokens() {
        let set = comparison();
        assert!(set.matches_text("Docker or Kubernetes?"));
        // "or" inside "for" must not match
        assert!(!set.matches_text("Looking for help"));
    }

    #[test]
    fn phrases_match_by_containment() {
        let set = comparison();
        assert!(set.matches_text("What are the Pros and Cons here"));
    }

    #[test]
    fn blank_entries_ignored() {
        assert_eq!(comparison().len(), 5);
        assert!(KeywordSet::new(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn matched_lists_hits() {
        let probe = TextProbe::new("Compare A vs B");
        assert_eq!(comparison().matched(&probe), vec!["compare", "vs"]);
    }

    #[test]
    fn probe_counts_words_and_questions() {
        let probe = TextProbe::new("Hello, how are you?");
        assert_eq!(probe.word_count(), 4);
        assert!(probe.has_question());
        assert!(probe.contains_token("hello"));
    }
}
