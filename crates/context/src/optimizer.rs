//! Handoff optimizer: memory context selection.
//!
//! Takes the ranked memory snippets handed over by the memory store and
//! packs them into a character budget sized by query complexity. Memories
//! are re-ranked by blending their upstream score with query-term overlap;
//! a memory that no longer fits is compressed into the remaining room
//! instead of being dropped outright.

use std::collections::BTreeSet;
use std::sync::Arc;

use baton_config::{KeywordConfig, OptimizerConfig, PipelineConfig};
use baton_core::keywords::{KeywordSet, TextProbe};
use baton_core::text::{char_len, safe_ratio, significant_terms};
use baton_core::MemoryCandidate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compressor::SmartContextCompressor;
use crate::extractor::EntityExtractor;
use crate::token::{chars_for_tokens, estimate_tokens};

/// One selected memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedMemory {
    pub content: String,
    /// Blended rank score in [0, 1].
    pub importance: f64,
    /// Score supplied by the memory store.
    pub original_score: f64,
    /// Position of this memory in the input list.
    pub source_index: usize,
    /// Whether `content` was compressed to fit.
    pub compressed: bool,
}

/// Output of [`HandoffOptimizer::optimize_memory_context`].
///
/// `total_length` is the summed character length of the selected contents
/// and never exceeds `max_length`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryOptimizationResult {
    /// Selected memories, highest importance first.
    pub memories: Vec<OptimizedMemory>,
    pub total_length: usize,
    /// Effective hard cap for this call.
    pub max_length: usize,
    /// Complexity-sized budget actually used for selection (≤ `max_length`).
    pub budget: usize,
    pub query_complexity: f64,
    /// `total_length / max_length`.
    pub context_utilization: f64,
    /// False only for an empty input list.
    pub optimization_applied: bool,
    pub dropped_count: usize,
    pub compressed_count: usize,
    pub estimated_tokens: usize,
}

impl MemoryOptimizationResult {
    pub fn empty(max_length: usize, query_complexity: f64) -> Self {
        Self {
            memories: Vec::new(),
            total_length: 0,
            max_length,
            budget: 0,
            query_complexity,
            context_utilization: 0.0,
            optimization_applied: false,
            dropped_count: 0,
            compressed_count: 0,
            estimated_tokens: 0,
        }
    }

    /// Selected contents joined by blank lines, ready for a prompt.
    pub fn context_text(&self) -> String {
        self.memories
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }
}

#[derive(Debug)]
struct QueryKeywords {
    comparison: KeywordSet,
    decision: KeywordSet,
    analysis: KeywordSet,
}

/// The optimizer. Holds only immutable shared state, so clones can run
/// concurrently without contention.
#[derive(Debug, Clone)]
pub struct HandoffOptimizer {
    compressor: SmartContextCompressor,
    keywords: Arc<QueryKeywords>,
    config: Arc<OptimizerConfig>,
}

impl HandoffOptimizer {
    pub fn new(
        compressor: SmartContextCompressor,
        keywords: &KeywordConfig,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            compressor,
            keywords: Arc::new(QueryKeywords {
                comparison: KeywordSet::new(&keywords.comparison),
                decision: KeywordSet::new(&keywords.decision),
                analysis: KeywordSet::new(&keywords.analysis),
            }),
            config: Arc::new(config),
        }
    }

    /// Build the optimizer and its compressor from one configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let extractor = Arc::new(EntityExtractor::new(&config.vocabulary));
        let compressor = SmartContextCompressor::new(extractor, config.compressor.clone());
        Self::new(compressor, &config.keywords, config.optimizer.clone())
    }

    pub fn compressor(&self) -> &SmartContextCompressor {
        &self.compressor
    }

    fn extractor(&self) -> &EntityExtractor {
        self.compressor.extractor()
    }

    /// Complexity estimate in `[min_complexity, 1]`.
    pub fn analyze_query_complexity(&self, query: &str) -> f64 {
        let floor = self.config.min_complexity.clamp(0.0, 1.0);
        if query.trim().is_empty() {
            return floor;
        }
        let probe = TextProbe::new(query);
        let w = &self.config.complexity_weights;

        let length_ratio = safe_ratio(probe.word_count() as f64, self.config.length_norm, 1.0);
        let mut score = length_ratio.min(1.0) * w.length;
        if self.keywords.comparison.matches(&probe) {
            score += w.comparison;
        }
        if self.keywords.decision.matches(&probe) {
            score += w.decision;
        }
        if self.keywords.analysis.matches(&probe) {
            score += w.analysis;
        }
        if probe.has_question() {
            score += w.question;
        }
        if score.is_nan() {
            return floor;
        }
        score.clamp(floor, 1.0)
    }

    /// Character budget granted to a query of the given complexity.
    pub fn adaptive_budget(&self, max_length: usize, complexity: f64) -> usize {
        let ratio = self.config.min_budget_ratio.clamp(0.0, 1.0);
        let share = ratio + (1.0 - ratio) * complexity.clamp(0.0, 1.0);
        ((max_length as f64 * share).floor() as usize).min(max_length)
    }

    /// Select and shrink `memories` to fit `max_length` characters.
    ///
    /// A zero `max_length` falls back to the configured default.
    pub fn optimize_memory_context(
        &self,
        memories: &[MemoryCandidate],
        query: &str,
        max_length: usize,
    ) -> MemoryOptimizationResult {
        let max_length = if max_length == 0 {
            self.config.default_max_length
        } else {
            max_length
        };
        let query_complexity = self.analyze_query_complexity(query);
        if memories.is_empty() {
            debug!(max_length, "No memories to optimize");
            return MemoryOptimizationResult::empty(max_length, query_complexity);
        }

        let budget = self.adaptive_budget(max_length, query_complexity);
        let query_terms = self.query_terms(query);

        let mut ranked: Vec<(usize, f64)> = memories
            .iter()
            .enumerate()
            .map(|(i, m)| (i, self.blended_score(m, &query_terms)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut selected = Vec::new();
        let mut remaining = budget;
        let mut compressed_count = 0;

        for (index, importance) in ranked {
            let memory = &memories[index];
            if memory.content.trim().is_empty() {
                continue;
            }
            let len = memory.len();
            if len <= remaining {
                remaining -= len;
                selected.push(OptimizedMemory {
                    content: memory.content.clone(),
                    importance,
                    original_score: memory.score,
                    source_index: index,
                    compressed: false,
                });
            } else if remaining >= self.config.min_compressed_length {
                let compressed = self.compressor.compress_context(&memory.content, remaining);
                if compressed.compressed_length == 0 || compressed.compressed_length > remaining {
                    continue;
                }
                remaining -= compressed.compressed_length;
                compressed_count += 1;
                selected.push(OptimizedMemory {
                    content: compressed.compressed_content,
                    importance,
                    original_score: memory.score,
                    source_index: index,
                    compressed: true,
                });
            }
        }

        let total_length = budget - remaining;
        let estimated_tokens = selected.iter().map(|m| estimate_tokens(&m.content)).sum();
        let dropped_count = memories.len() - selected.len();

        debug!(
            memories = memories.len(),
            selected = selected.len(),
            compressed = compressed_count,
            dropped = dropped_count,
            total_length,
            budget,
            complexity = query_complexity,
            "Optimized memory context"
        );

        MemoryOptimizationResult {
            memories: selected,
            total_length,
            max_length,
            budget,
            query_complexity,
            context_utilization: safe_ratio(total_length as f64, max_length as f64, 0.0)
                .clamp(0.0, 1.0),
            optimization_applied: true,
            dropped_count,
            compressed_count,
            estimated_tokens,
        }
    }

    /// [`optimize_memory_context`](Self::optimize_memory_context) with the
    /// cap given in tokens.
    pub fn optimize_for_token_budget(
        &self,
        memories: &[MemoryCandidate],
        query: &str,
        max_tokens: usize,
    ) -> MemoryOptimizationResult {
        self.optimize_memory_context(memories, query, chars_for_tokens(max_tokens))
    }

    /// Same as [`optimize_memory_context`](Self::optimize_memory_context),
    /// run on the blocking pool.
    pub async fn optimize_memory_context_async(
        &self,
        memories: impl Into<Arc<[MemoryCandidate]>>,
        query: impl Into<String>,
        max_length: usize,
    ) -> MemoryOptimizationResult {
        let memories: Arc<[MemoryCandidate]> = memories.into();
        let query = query.into();
        let this = self.clone();
        let task_query = query.clone();
        match tokio::task::spawn_blocking(move || {
            this.optimize_memory_context(&memories, &task_query, max_length)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Memory optimization task failed, returning empty context");
                let max_length = if max_length == 0 {
                    self.config.default_max_length
                } else {
                    max_length
                };
                MemoryOptimizationResult::empty(max_length, self.analyze_query_complexity(&query))
            }
        }
    }

    /// Fraction of the original's terms still present in `preserved`.
    ///
    /// 1.0 when the original has no extractable terms.
    pub fn calculate_preservation_quality(&self, original: &str, preserved: &str) -> f64 {
        let terms = self.extractor().extract_terms(original);
        if terms.is_empty() {
            return 1.0;
        }
        let lowered = preserved.to_lowercase();
        let kept = terms.iter().filter(|t| lowered.contains(t.as_str())).count();
        kept as f64 / terms.len() as f64
    }

    fn query_terms(&self, query: &str) -> BTreeSet<String> {
        let mut terms = self.extractor().extract_terms(query);
        terms.extend(significant_terms(query));
        terms
    }

    fn blended_score(&self, memory: &MemoryCandidate, query_terms: &BTreeSet<String>) -> f64 {
        let overlap = if query_terms.is_empty() {
            0.0
        } else {
            let probe = TextProbe::new(&memory.content);
            let hits = query_terms
                .iter()
                .filter(|t| {
                    if t.contains(char::is_whitespace) {
                        probe.lowered().contains(t.as_str())
                    } else {
                        probe.contains_token(t)
                    }
                })
                .count();
            hits as f64 / query_terms.len() as f64
        };
        let sw = self.config.similarity_weight;
        let ow = self.config.overlap_weight;
        safe_ratio(sw * memory.normalized_score() + ow * overlap, sw + ow, 0.0).clamp(0.0, 1.0)
    }
}

impl Default for HandoffOptimizer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}
