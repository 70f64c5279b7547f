//! Query feature extraction for debate scoring.

use baton_config::KeywordConfig;
use baton_core::keywords::{KeywordSet, TextProbe};
use serde::Serialize;

/// Signals found in a query. Each keyword list holds the matched keywords
/// of that class, empty when the class did not fire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryFeatures {
    pub word_count: usize,
    pub comparison: Vec<String>,
    pub decision: Vec<String>,
    pub analysis: Vec<String>,
    pub reasoning: Vec<String>,
    pub debate_patterns: Vec<String>,
    pub has_question: bool,
}

impl QueryFeatures {
    pub fn has_comparison(&self) -> bool {
        !self.comparison.is_empty()
    }

    pub fn has_decision(&self) -> bool {
        !self.decision.is_empty()
    }

    pub fn has_analysis(&self) -> bool {
        !self.analysis.is_empty()
    }

    pub fn has_reasoning(&self) -> bool {
        !self.reasoning.is_empty()
    }

    pub fn has_debate_pattern(&self) -> bool {
        !self.debate_patterns.is_empty()
    }

    /// Human-readable list of the signal classes that fired.
    pub fn fired_signals(&self) -> Vec<String> {
        let classes = [
            ("comparison", &self.comparison),
            ("decision", &self.decision),
            ("analysis", &self.analysis),
            ("reasoning", &self.reasoning),
            ("debate pattern", &self.debate_patterns),
        ];
        let mut fired: Vec<String> = classes
            .into_iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(name, hits)| format!("{name} ({})", hits.join(", ")))
            .collect();
        if self.has_question {
            fired.push("question".to_string());
        }
        fired
    }
}

/// The five keyword classes, compiled once.
#[derive(Debug)]
pub(crate) struct DebateKeywords {
    comparison: KeywordSet,
    decision: KeywordSet,
    analysis: KeywordSet,
    reasoning: KeywordSet,
    debate_patterns: KeywordSet,
}

impl DebateKeywords {
    pub(crate) fn new(config: &KeywordConfig) -> Self {
        Self {
            comparison: KeywordSet::new(&config.comparison),
            decision: KeywordSet::new(&config.decision),
            analysis: KeywordSet::new(&config.analysis),
            reasoning: KeywordSet::new(&config.reasoning),
            debate_patterns: KeywordSet::new(&config.debate_patterns),
        }
    }

    pub(crate) fn extract(&self, query: &str) -> QueryFeatures {
        if query.trim().is_empty() {
            return QueryFeatures::default();
        }
        let probe = TextProbe::new(query);
        QueryFeatures {
            word_count: probe.word_count(),
            comparison: self.comparison.matched(&probe),
            decision: self.decision.matched(&probe),
            analysis: self.analysis.matched(&probe),
            reasoning: self.reasoning.matched(&probe),
            debate_patterns: self.debate_patterns.matched(&probe),
            has_question: probe.has_question(),
        }
    }
}
