//! Entity and concept extraction.
//!
//! Pulls salient terms out of free text with lightweight pattern matching:
//!
//! - **Entities**: technology names and technical nouns from the configured
//!   vocabulary, plus acronyms (`API`, `AWS`, `K8S`)
//! - **Concepts**: domain keywords, capitalized multi-word names
//!   (`Google Cloud Platform`), hyphenated compounds (`event-driven`), and
//!   abstract nouns recognized by suffix (`scalability`, `deployment`)
//!
//! Every returned term is lowercase and occurs verbatim in the lowercased
//! source text, so a text always fully "preserves" its own terms.

use std::collections::BTreeSet;

use baton_config::VocabularyConfig;
use baton_core::keywords::{KeywordSet, TextProbe};
use baton_core::text::is_stopword;
use regex_lite::Regex;

/// Abstract-noun suffixes that mark a token as a concept.
const CONCEPT_SUFFIXES: &[&str] = &["tion", "sion", "ment", "ity", "ance", "ence", "ism", "ness"];

/// Shortest token considered for suffix-based concept detection.
const MIN_SUFFIX_CONCEPT_LEN: usize = 7;

/// All-caps words that are not acronyms.
const NON_ACRONYMS: &[&str] = &["OK", "AM", "PM"];

/// The extractor. Immutable after construction, share it via `Arc`.
#[derive(Debug)]
pub struct EntityExtractor {
    technical: KeywordSet,
    domain: KeywordSet,
    acronym: Option<Regex>,
    capitalized_span: Option<Regex>,
    hyphenated: Option<Regex>,
}

impl EntityExtractor {
    pub fn new(vocabulary: &VocabularyConfig) -> Self {
        Self {
            technical: KeywordSet::new(&vocabulary.technical_terms),
            domain: KeywordSet::new(&vocabulary.domain_keywords),
            acronym: compile(r"\b[A-Z][A-Z0-9]{1,5}\b"),
            capitalized_span: compile(r"\b[A-Z][a-z0-9]+(?: [A-Z][a-z0-9]+)+\b"),
            hyphenated: compile(r"\b[A-Za-z]+(?:-[A-Za-z]+)+\b"),
        }
    }

    /// Extract entities (technology names, acronyms).
    ///
    /// Empty input yields an empty set.
    pub fn extract_entities(&self, text: &str) -> BTreeSet<String> {
        if text.trim().is_empty() {
            return BTreeSet::new();
        }
        let probe = TextProbe::new(text);
        let mut entities: BTreeSet<String> = self.technical.matched(&probe).into_iter().collect();

        for m in self.acronym.iter().flat_map(|re| re.find_iter(text)) {
            let word = m.as_str();
            if !NON_ACRONYMS.contains(&word) {
                entities.insert(word.to_lowercase());
            }
        }
        entities
    }

    /// Extract key concepts (domain keywords, noun-phrase-like spans).
    ///
    /// Empty input yields an empty set.
    pub fn extract_key_concepts(&self, text: &str) -> BTreeSet<String> {
        if text.trim().is_empty() {
            return BTreeSet::new();
        }
        let probe = TextProbe::new(text);
        let mut concepts: BTreeSet<String> = self.domain.matched(&probe).into_iter().collect();

        for m in self.capitalized_span.iter().flat_map(|re| re.find_iter(text)) {
            let words: Vec<&str> = m
                .as_str()
                .split(' ')
                .skip_while(|w| is_stopword(&w.to_lowercase()))
                .collect();
            if words.len() >= 2 {
                concepts.insert(words.join(" ").to_lowercase());
            }
        }

        for m in self.hyphenated.iter().flat_map(|re| re.find_iter(text)) {
            concepts.insert(m.as_str().to_lowercase());
        }

        for token in baton_core::text::tokenize(text) {
            let is_word = token.chars().all(char::is_alphabetic);
            if is_word
                && token.chars().count() >= MIN_SUFFIX_CONCEPT_LEN
                && CONCEPT_SUFFIXES.iter().any(|s| token.ends_with(s))
            {
                concepts.insert(token);
            }
        }
        concepts
    }

    /// Entities and concepts together.
    pub fn extract_terms(&self, text: &str) -> BTreeSet<String> {
        let mut terms = self.extract_entities(text);
        terms.extend(self.extract_key_concepts(text));
        terms
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(&VocabularyConfig::default())
    }
}

/// Compile one of the fixed patterns above. A pattern that fails to
/// compile disables only that extraction rule.
fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .inspect_err(|e| tracing::warn!(pattern, error = %e, "Extractor pattern disabled"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::default()
    }

    #[test]
    fn empty_text_yields_nothing() {
        let ex = extractor();
        assert!(ex.extract_entities("").is_empty());
        assert!(ex.extract_key_concepts("   ").is_empty());
    }

    #[test]
    fn vocabulary_entities_found() {
        let ents = extractor().extract_entities("Should I use Docker or Kubernetes?");
        assert!(ents.contains("docker"));
        assert!(ents.contains("kubernetes"));
    }

    #[test]
    fn acronyms_are_entities() {
        let ents = extractor().extract_entities("Expose the REST API behind AWS ELB, it's OK.");
        assert!(ents.contains("api"));
        assert!(ents.contains("aws"));
        assert!(ents.contains("elb"));
        assert!(!ents.contains("ok"));
    }

    #[test]
    fn multi_word_vocabulary_terms() {
        let ents = extractor().extract_entities("We need a vector database for machine learning.");
        assert!(ents.contains("vector database"));
        assert!(ents.contains("machine learning"));
    }

    #[test]
    fn concepts_from_patterns() {
        let concepts = extractor().extract_key_concepts(
            "The Google Cloud Platform offers event-driven scalability and better performance.",
        );
        assert!(concepts.contains("google cloud platform"));
        assert!(concepts.contains("event-driven"));
        assert!(concepts.contains("scalability"));
        assert!(concepts.contains("performance"));
    }

    #[test]
    fn leading_stopwords_stripped_from_spans() {
        let concepts = extractor().extract_key_concepts("The Rust Foundation funds work.");
        assert!(concepts.contains("rust foundation"));
        assert!(!concepts.iter().any(|c| c.starts_with("the ")));
    }

    #[test]
    fn every_term_occurs_in_lowercased_source() {
        let text = "Migrating from MySQL to PostgreSQL: the Data Platform Team evaluated \
                    read-heavy workloads; replication consistency was the main consideration.";
        let lowered = text.to_lowercase();
        for term in extractor().extract_terms(text) {
            assert!(lowered.contains(&term), "{term} not in source");
        }
    }

    #[test]
    fn plain_chitchat_has_few_terms() {
        assert!(extractor().extract_terms("Hello, how are you?").is_empty());
    }
}
