//! The five quality assessors.
//!
//! Each assessor starts from a neutral base, adds or subtracts bounded
//! increments for structural signals, and clamps into [0, 1]. An empty
//! response scores the midpoint on every axis.

use std::collections::BTreeSet;

use baton_config::KeywordConfig;
use baton_core::keywords::{KeywordSet, TextProbe};
use baton_core::text::{char_len, significant_terms};
use serde::{Deserialize, Serialize};

use crate::metrics::QualityMetrics;

/// Score for an empty response.
pub const MIDPOINT: f64 = 0.5;

const BASE: f64 = 0.5;
const MIN_SUBSTANTIVE_CHARS: usize = 40;
const DETAILED_CHARS: usize = 200;
const MAX_REASONABLE_CHARS: usize = 8000;

/// Optional caller-supplied expectations for a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityContext {
    /// Terms the answer is expected to mention.
    #[serde(default)]
    pub required_terms: Vec<String>,
    /// The answer is expected to contain a code block.
    #[serde(default)]
    pub expects_code: bool,
}

/// Structural facts about a response, computed once and shared by the
/// assessors.
struct ResponseShape {
    chars: usize,
    has_structure: bool,
    paragraphs: usize,
    code_fences: usize,
    list_items: usize,
}

impl ResponseShape {
    fn of(response: &str) -> Self {
        let mut list_items = 0;
        let mut headings = 0;
        for line in response.lines().map(str::trim_start) {
            if line.starts_with('#') {
                headings += 1;
            } else if line.starts_with("- ") || line.starts_with("* ") || is_numbered(line) {
                list_items += 1;
            }
        }
        Self {
            chars: char_len(response),
            has_structure: headings > 0 || list_items > 0,
            paragraphs: response.split("\n\n").filter(|p| !p.trim().is_empty()).count(),
            code_fences: response.matches("```").count(),
            list_items,
        }
    }

    fn has_code_block(&self) -> bool {
        self.code_fences >= 2
    }

    fn has_unbalanced_fence(&self) -> bool {
        self.code_fences % 2 == 1
    }
}

fn is_numbered(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(". ")
}

/// The assessor set, compiled once from keyword configuration.
#[derive(Debug)]
pub struct Assessors {
    action_query: KeywordSet,
    action_response: KeywordSet,
    failure_phrases: KeywordSet,
    hedging: KeywordSet,
    polite: KeywordSet,
    dismissive: KeywordSet,
    explanatory: KeywordSet,
    examples: KeywordSet,
    code_query: KeywordSet,
}

impl Assessors {
    pub fn new(keywords: &KeywordConfig) -> Self {
        Self {
            action_query: KeywordSet::new(&keywords.action_query),
            action_response: KeywordSet::new(&keywords.action_response),
            failure_phrases: KeywordSet::new(&keywords.failure_phrases),
            hedging: KeywordSet::new(&keywords.hedging),
            polite: KeywordSet::new(&keywords.polite),
            dismissive: KeywordSet::new(&keywords.dismissive),
            explanatory: KeywordSet::new(&keywords.explanatory),
            examples: KeywordSet::new(&keywords.examples),
            code_query: KeywordSet::new(&keywords.code_query),
        }
    }

    /// Score a response on all five axes.
    pub fn assess(&self, query: &str, response: &str, context: Option<&QualityContext>) -> QualityMetrics {
        if response.trim().is_empty() {
            return QualityMetrics::new(MIDPOINT, MIDPOINT, MIDPOINT, MIDPOINT, MIDPOINT);
        }
        let default_context = QualityContext::default();
        let context = context.unwrap_or(&default_context);
        let query_probe = TextProbe::new(query);
        let response_probe = TextProbe::new(response);
        let shape = ResponseShape::of(response);
        let expects_code = context.expects_code || self.code_query.matches(&query_probe);

        QualityMetrics::new(
            self.format(&shape, context.expects_code),
            self.semantic(query, &response_probe, context),
            self.relevance(query, &response_probe),
            self.tone(response, &response_probe),
            self.solution(&query_probe, &response_probe, &shape, expects_code),
        )
    }

    fn format(&self, shape: &ResponseShape, expects_code: bool) -> f64 {
        let mut score = BASE;
        if shape.has_structure {
            score += 0.15;
        }
        if shape.paragraphs > 1 {
            score += 0.1;
        }
        if shape.has_code_block() {
            score += 0.1;
        }
        if shape.has_unbalanced_fence() {
            score -= 0.2;
        }
        if shape.chars < MIN_SUBSTANTIVE_CHARS {
            score -= 0.1;
        } else if shape.chars <= MAX_REASONABLE_CHARS {
            score += 0.05;
        } else {
            score -= 0.1;
        }
        if expects_code {
            score += if shape.has_code_block() { 0.1 } else { -0.15 };
        }
        clamp(score)
    }

    fn semantic(&self, query: &str, response: &TextProbe, context: &QualityContext) -> f64 {
        let mut score = BASE;
        let mut terms: BTreeSet<String> = significant_terms(query);
        terms.extend(context.required_terms.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()));
        if !terms.is_empty() {
            score += 0.3 * coverage(&terms, response) - 0.1;
        }
        if self.failure_phrases.matches(response) {
            score -= 0.25;
        }
        if self.hedging.matches(response) {
            score -= 0.1;
        }
        if self.explanatory.matches(response) {
            score += 0.1;
        }
        if self.examples.matches(response) {
            score += 0.05;
        }
        clamp(score)
    }

    fn relevance(&self, query: &str, response: &TextProbe) -> f64 {
        let terms = significant_terms(query);
        if terms.is_empty() {
            return BASE;
        }
        let overlap = coverage(&terms, response);
        let mut score = BASE + 0.45 * overlap;
        if overlap == 0.0 {
            score -= 0.25;
        }
        clamp(score)
    }

    fn tone(&self, response: &str, probe: &TextProbe) -> f64 {
        let mut score = BASE;
        let dismissive = self.dismissive.matches(probe);
        let shouting = is_shouting(response);
        if self.polite.matches(probe) {
            score += 0.15;
        }
        if dismissive {
            score -= 0.3;
        }
        if shouting {
            score -= 0.15;
        }
        if response.matches('!').count() > 3 {
            score -= 0.05;
        }
        if !dismissive && !shouting {
            score += 0.15;
        }
        clamp(score)
    }

    fn solution(&self, query: &TextProbe, response: &TextProbe, shape: &ResponseShape, expects_code: bool) -> f64 {
        let mut score = BASE;
        if self.action_query.matches(query) {
            score += if self.action_response.matches(response) { 0.2 } else { -0.1 };
        }
        if shape.list_items >= 2 {
            score += 0.1;
        }
        if expects_code && shape.has_code_block() {
            score += 0.1;
        }
        if self.failure_phrases.matches(response) {
            score -= 0.3;
        }
        if shape.chars >= DETAILED_CHARS {
            score += 0.05;
        } else if shape.chars < MIN_SUBSTANTIVE_CHARS {
            score -= 0.1;
        }
        clamp(score)
    }
}

impl Default for Assessors {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

/// Fraction of `terms` present in the probed text.
fn coverage(terms: &BTreeSet<String>, probe: &TextProbe) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let hits = terms
        .iter()
        .filter(|t| {
            if t.contains(char::is_whitespace) {
                probe.lowered().contains(t.as_str())
            } else {
                probe.contains_token(t)
            }
        })
        .count();
    hits as f64 / terms.len() as f64
}

/// Mostly-uppercase prose (ignores short texts and code-like acronyms).
fn is_shouting(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 20 {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters.len() as f64 > 0.6
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessors() -> Assessors {
        Assessors::default()
    }

    const QUERY: &str = "How do I install Redis on Ubuntu?";
    const GOOD: &str = "You can install Redis from the Ubuntu package repository.\n\n\
        1. Run `sudo apt update` first.\n\
        2. Then install it with `sudo apt install redis-server`.\n\
        3. Make sure the service is enabled so that Redis starts on boot.\n\n\
        Hope this helps!";

    #[test]
    fn empty_response_scores_midpoint() {
        let m = assessors().assess(QUERY, "", None);
        for (_, value) in m.values() {
            assert!((value - MIDPOINT).abs() < 1e-12);
        }
    }

    #[test]
    fn every_axis_in_unit_range() {
        let a = assessors();
        for response in [GOOD, "no", "TODO", "OBVIOUSLY YOU SHOULD JUST GOOGLE IT!!!! WHATEVER!!!", "```\nunclosed"] {
            for (name, value) in a.assess(QUERY, response, None).values() {
                assert!((0.0..=1.0).contains(&value), "{name} = {value}");
            }
        }
    }

    #[test]
    fn good_answer_beats_placeholder() {
        let a = assessors();
        let good = a.assess(QUERY, GOOD, None);
        let bad = a.assess(QUERY, "TODO: placeholder, not implemented", None);
        assert!(good.overall_score() > bad.overall_score());
        assert!(good.solution_quality > bad.solution_quality);
        assert!(good.semantic_correctness > bad.semantic_correctness);
    }

    #[test]
    fn action_query_rewards_action_response() {
        let a = assessors();
        let with_steps = a.assess(QUERY, GOOD, None);
        let without = a.assess(QUERY, "Redis is an in-memory data store that Ubuntu supports.", None);
        assert!(with_steps.solution_quality > without.solution_quality);
    }

    #[test]
    fn dismissive_tone_penalized() {
        let a = assessors();
        let polite = a.assess(QUERY, "Happy to help, please see the steps above.", None);
        let rude = a.assess(QUERY, "Obviously you should figure it out yourself.", None);
        assert!(polite.tone > rude.tone);
    }

    #[test]
    fn off_topic_answer_loses_relevance() {
        let a = assessors();
        let on = a.assess(QUERY, GOOD, None);
        let off = a.assess(QUERY, "The weather in Paris is lovely in spring.", None);
        assert!(on.relevance > off.relevance);
    }

    #[test]
    fn expected_code_counts_toward_format() {
        let a = assessors();
        let ctx = QualityContext {
            expects_code: true,
            ..Default::default()
        };
        let with_code = a.assess("Write a sorting routine", "Here it is:\n```rust\nv.sort();\n```\nThis sorts in place.", Some(&ctx));
        let prose = a.assess("Write a sorting routine", "Just call the sort method on the vector, it sorts in place.", Some(&ctx));
        assert!(with_code.format_compliance > prose.format_compliance);
    }

    #[test]
    fn required_terms_count_toward_semantic() {
        let a = assessors();
        let ctx = QualityContext {
            required_terms: vec!["persistence".into()],
            ..Default::default()
        };
        let covered = a.assess(QUERY, "Enable persistence after you install Redis on Ubuntu.", Some(&ctx));
        let missing = a.assess(QUERY, "Install Redis on Ubuntu with apt.", Some(&ctx));
        assert!(covered.semantic_correctness > missing.semantic_correctness);
    }

    #[test]
    fn numbered_lines_detected() {
        assert!(is_numbered("12. step"));
        assert!(!is_numbered("12500 rows"));
        assert!(!is_numbered("v1. thing"));
    }
}
