//! Smart context compression.
//!
//! Shrinks a text blob to a character budget while keeping the sentences
//! that carry its entities and concepts. Whole sentences are preferred over
//! mid-sentence cuts; head truncation is the fallback when no sentence fits.

use std::collections::BTreeSet;
use std::sync::Arc;

use baton_config::CompressorConfig;
use baton_core::text::{char_len, split_sentences, truncate_chars};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extractor::EntityExtractor;

/// Which path produced a [`CompressedContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStrategy {
    /// Blank input.
    Empty,
    /// Input already within the target, returned unchanged.
    Passthrough,
    /// Whole sentences selected by score.
    SentenceSelection,
    /// No sentence fit; the head of the text was kept.
    HeadTruncation,
}

/// Result of compressing one text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedContext {
    pub original_length: usize,
    pub compressed_length: usize,
    pub compressed_content: String,
    /// Entities found in the source text.
    pub key_entities: BTreeSet<String>,
    /// Concepts found in the source text.
    pub key_concepts: BTreeSet<String>,
    /// `compressed_length / max(1, original_length)`.
    pub compression_ratio: f64,
    pub strategy: CompressionStrategy,
}

impl CompressedContext {
    pub fn empty() -> Self {
        Self {
            original_length: 0,
            compressed_length: 0,
            compressed_content: String::new(),
            key_entities: BTreeSet::new(),
            key_concepts: BTreeSet::new(),
            compression_ratio: 0.0,
            strategy: CompressionStrategy::Empty,
        }
    }

    /// Whether the output is within `target × tolerance_factor`.
    pub fn within_tolerance(&self, target_length: usize, tolerance_factor: f64) -> bool {
        self.compressed_length as f64 <= target_length as f64 * tolerance_factor
    }

    /// Fraction of the source's key terms still present in the output.
    /// 1.0 when the source had no terms.
    pub fn term_coverage(&self) -> f64 {
        let total = self.key_entities.len() + self.key_concepts.len();
        if total == 0 {
            return 1.0;
        }
        let lowered = self.compressed_content.to_lowercase();
        let kept = self
            .key_entities
            .iter()
            .chain(&self.key_concepts)
            .filter(|t| lowered.contains(t.as_str()))
            .count();
        kept as f64 / total as f64
    }
}

/// A sentence candidate during selection.
struct ScoredSentence<'a> {
    text: &'a str,
    len: usize,
    score: f64,
    terms: Vec<usize>,
}

/// The compressor. Cheap to clone; all state is immutable and shared.
#[derive(Debug, Clone)]
pub struct SmartContextCompressor {
    extractor: Arc<EntityExtractor>,
    config: Arc<CompressorConfig>,
}

impl SmartContextCompressor {
    pub fn new(extractor: Arc<EntityExtractor>, config: CompressorConfig) -> Self {
        Self {
            extractor,
            config: Arc::new(config),
        }
    }

    pub fn extractor(&self) -> &Arc<EntityExtractor> {
        &self.extractor
    }

    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Compress `text` to about `target_length` characters.
    ///
    /// A zero target falls back to the configured default. The output never
    /// exceeds the effective target.
    pub fn compress_context(&self, text: &str, target_length: usize) -> CompressedContext {
        if text.trim().is_empty() {
            return CompressedContext::empty();
        }
        let target = self.effective_target(target_length);
        let original_length = char_len(text);

        let key_entities = self.extractor.extract_entities(text);
        let key_concepts = self.extractor.extract_key_concepts(text);

        if original_length <= target {
            return CompressedContext {
                original_length,
                compressed_length: original_length,
                compressed_content: text.to_string(),
                key_entities,
                key_concepts,
                compression_ratio: 1.0,
                strategy: CompressionStrategy::Passthrough,
            };
        }

        let (content, strategy) = match self.select_sentences(text, target, &key_entities, &key_concepts) {
            Some(selected) => (selected, CompressionStrategy::SentenceSelection),
            None => (self.head_truncate(text, target), CompressionStrategy::HeadTruncation),
        };
        let compressed_length = char_len(&content);
        let compression_ratio = compressed_length as f64 / original_length.max(1) as f64;

        debug!(
            original = original_length,
            compressed = compressed_length,
            target,
            ratio = compression_ratio,
            ?strategy,
            "Compressed context"
        );

        CompressedContext {
            original_length,
            compressed_length,
            compressed_content: content,
            key_entities,
            key_concepts,
            compression_ratio,
            strategy,
        }
    }

    /// Same as [`compress_context`](Self::compress_context), run on the
    /// blocking pool.
    pub async fn compress_context_async(
        &self,
        text: impl Into<Arc<str>>,
        target_length: usize,
    ) -> CompressedContext {
        let text: Arc<str> = text.into();
        let this = self.clone();
        let input = Arc::clone(&text);
        match tokio::task::spawn_blocking(move || this.compress_context(&input, target_length)).await {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!(error = %e, "Compression task failed, falling back to head truncation");
                self.truncation_only(&text, target_length)
            }
        }
    }

    fn effective_target(&self, target_length: usize) -> usize {
        if target_length == 0 {
            self.config.default_target_length.max(1)
        } else {
            target_length
        }
    }

    /// Two-pass greedy selection. Returns `None` when no sentence fits.
    fn select_sentences(
        &self,
        text: &str,
        target: usize,
        entities: &BTreeSet<String>,
        concepts: &BTreeSet<String>,
    ) -> Option<String> {
        let terms: Vec<(&str, f64)> = entities
            .iter()
            .map(|e| (e.as_str(), self.config.entity_weight))
            .chain(concepts.iter().map(|c| (c.as_str(), self.config.concept_weight)))
            .collect();

        let leading = self.config.leading_sentences;
        let sentences: Vec<ScoredSentence<'_>> = split_sentences(text)
            .into_iter()
            .enumerate()
            .map(|(i, sentence)| {
                let lowered = sentence.to_lowercase();
                let mut score = 0.0;
                let mut hits = Vec::new();
                for (idx, (term, weight)) in terms.iter().enumerate() {
                    if lowered.contains(term) {
                        score += weight;
                        hits.push(idx);
                    }
                }
                if i < leading {
                    score += self.config.position_bonus * (leading - i) as f64 / leading as f64;
                }
                ScoredSentence {
                    text: sentence,
                    len: char_len(sentence),
                    score,
                    terms: hits,
                }
            })
            .collect();

        let mut selected = vec![false; sentences.len()];
        let mut covered = vec![false; terms.len()];
        let mut used = 0usize;
        let cost = |used: usize, len: usize| if used == 0 { len } else { used + 1 + len };

        // Coverage pass: best-scoring sentence that adds an uncovered term.
        loop {
            let best = sentences
                .iter()
                .enumerate()
                .filter(|(i, s)| !selected[*i] && cost(used, s.len) <= target)
                .filter(|(_, s)| s.terms.iter().any(|t| !covered[*t]))
                .max_by(|(ia, a), (ib, b)| a.score.total_cmp(&b.score).then(ib.cmp(ia)));
            let Some((idx, sentence)) = best else { break };
            selected[idx] = true;
            used = cost(used, sentence.len);
            for t in &sentence.terms {
                covered[*t] = true;
            }
        }

        // Fill pass: remaining sentences by score.
        let mut order: Vec<usize> = (0..sentences.len()).filter(|i| !selected[*i]).collect();
        order.sort_by(|a, b| sentences[*b].score.total_cmp(&sentences[*a].score));
        for idx in order {
            let next = cost(used, sentences[idx].len);
            if next <= target {
                selected[idx] = true;
                used = next;
            }
        }

        let kept: Vec<&str> = sentences
            .iter()
            .zip(&selected)
            .filter(|(_, keep)| **keep)
            .map(|(s, _)| s.text)
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(kept.join(" "))
        }
    }

    /// First `target` characters, backed off to a word boundary when one
    /// lies within the trailing window of the cut.
    fn head_truncate(&self, text: &str, target: usize) -> String {
        let text = text.trim();
        let cut = truncate_chars(text, target);
        if cut.len() == text.len() {
            return cut.to_string();
        }

        let mid_word = text[cut.len()..].chars().next().is_some_and(|c| !c.is_whitespace());
        if mid_word {
            let window = self.config.word_boundary_window.clamp(0.0, 1.0);
            let min_keep = (target as f64 * (1.0 - window)).ceil() as usize;
            if let Some(idx) = cut.rfind(char::is_whitespace) {
                let kept = cut[..idx].trim_end();
                if !kept.is_empty() && char_len(kept) >= min_keep {
                    return kept.to_string();
                }
            }
        }
        cut.trim_end().to_string()
    }

    /// Degraded result used when the worker task is lost.
    fn truncation_only(&self, text: &str, target_length: usize) -> CompressedContext {
        if text.trim().is_empty() {
            return CompressedContext::empty();
        }
        let target = self.effective_target(target_length);
        let original_length = char_len(text);
        let content = self.head_truncate(text, target);
        let compressed_length = char_len(&content);
        CompressedContext {
            original_length,
            compressed_length,
            compression_ratio: compressed_length as f64 / original_length.max(1) as f64,
            compressed_content: content,
            key_entities: BTreeSet::new(),
            key_concepts: BTreeSet::new(),
            strategy: CompressionStrategy::HeadTruncation,
        }
    }
}

impl Default for SmartContextCompressor {
    fn default() -> Self {
        Self::new(Arc::new(EntityExtractor::default()), CompressorConfig::default())
    }
}
