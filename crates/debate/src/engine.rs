//! The debate activation engine.
//!
//! Scores a query for complexity and debate worthiness and picks the
//! deliberation protocol. Scoring is lock-free; only the activation
//! counters sit behind a mutex.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use baton_config::{DebateConfig, KeywordConfig, PipelineConfig};
use baton_core::sync;
use serde::Serialize;
use tracing::{debug, warn};

use crate::decision::{ActivationContext, DebateActivationDecision, DebateProtocol};
use crate::features::{DebateKeywords, QueryFeatures};

/// Running activation counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivationStats {
    pub evaluations: u64,
    pub activations: u64,
    pub by_protocol: BTreeMap<DebateProtocol, u64>,
}

impl ActivationStats {
    pub fn activation_rate(&self) -> f64 {
        baton_core::safe_ratio(self.activations as f64, self.evaluations as f64, 0.0)
    }
}

struct EngineInner {
    keywords: DebateKeywords,
    config: DebateConfig,
    stats: Mutex<ActivationStats>,
}

/// Decides whether a query goes to the debate executor. Clones share the
/// same counters.
#[derive(Clone)]
pub struct DebateActivationEngine {
    inner: Arc<EngineInner>,
}

impl DebateActivationEngine {
    pub fn new(keywords: &KeywordConfig, config: DebateConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                keywords: DebateKeywords::new(keywords),
                config,
                stats: Mutex::new(ActivationStats::default()),
            }),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.keywords, config.debate.clone())
    }

    pub fn config(&self) -> &DebateConfig {
        &self.inner.config
    }

    pub fn extract_features(&self, query: &str) -> QueryFeatures {
        self.inner.keywords.extract(query)
    }

    /// Weighted feature sum, capped at 1.0.
    pub fn complexity(&self, features: &QueryFeatures) -> f64 {
        let cfg = &self.inner.config;
        let w = &cfg.complexity_weights;
        let length = baton_core::safe_ratio(features.word_count as f64, cfg.length_norm, 0.0);
        let mut score = length.min(1.0) * w.length;
        score += flag(features.has_comparison(), w.comparison);
        score += flag(features.has_decision(), w.decision);
        score += flag(features.has_analysis(), w.analysis);
        score += flag(features.has_reasoning(), w.reasoning);
        score += flag(features.has_debate_pattern(), w.debate_pattern);
        score += flag(features.has_question, w.question);
        cap(score)
    }

    /// Debate worthiness, capped at 1.0.
    pub fn worthiness(&self, features: &QueryFeatures, context: Option<&ActivationContext>) -> f64 {
        let cfg = &self.inner.config;
        let w = &cfg.worthiness_weights;
        let mut score = flag(features.has_comparison(), w.comparison)
            + flag(features.has_decision(), w.decision)
            + flag(features.has_analysis(), w.analysis)
            + flag(features.has_reasoning(), w.reasoning)
            + flag(features.has_debate_pattern(), w.debate_pattern)
            + flag(features.has_question, w.question)
            + flag(features.word_count >= cfg.long_query_words, w.length_bonus);

        if let Some(ctx) = context {
            if ctx.conflicting_evidence {
                score += cfg.conflict_bonus;
            }
            if ctx.explicit_request {
                score = score.max(cfg.activation_threshold);
            }
        }
        cap(score)
    }

    /// Protocol for an activated query, by priority.
    pub fn select_protocol(&self, features: &QueryFeatures, complexity: f64) -> DebateProtocol {
        if complexity > self.inner.config.judge_complexity_threshold && features.has_comparison() {
            DebateProtocol::Judge
        } else if features.has_decision() {
            DebateProtocol::Sequential
        } else if features.has_analysis() {
            DebateProtocol::Parallel
        } else if features.has_reasoning() {
            DebateProtocol::Critique
        } else {
            DebateProtocol::Sequential
        }
    }

    pub fn should_activate_debate(
        &self,
        query: &str,
        context: Option<&ActivationContext>,
    ) -> DebateActivationDecision {
        let features = self.extract_features(query);
        let complexity = self.complexity(&features);
        let worthiness = self.worthiness(&features, context);
        let threshold = self.inner.config.activation_threshold;

        let mut signals = features.fired_signals();
        if let Some(ctx) = context {
            if ctx.explicit_request {
                signals.push("explicit request".to_string());
            }
            if ctx.conflicting_evidence {
                signals.push("conflicting evidence".to_string());
            }
        }
        let fired = if signals.is_empty() {
            "no debate signals".to_string()
        } else {
            signals.join(", ")
        };

        let decision = if worthiness >= threshold {
            let protocol = self.select_protocol(&features, complexity);
            DebateActivationDecision::activated(
                protocol,
                worthiness,
                complexity,
                format!(
                    "Debate activated (worthiness {worthiness:.2} >= {threshold:.2}; \
                     complexity {complexity:.2}): {fired}; protocol {protocol}"
                ),
            )
        } else {
            DebateActivationDecision::inactive(
                worthiness,
                complexity,
                format!("Debate not needed (worthiness {worthiness:.2} < {threshold:.2}): {fired}"),
            )
        };

        self.record(&decision);
        debug!(
            activate = decision.should_activate(),
            protocol = %decision.protocol(),
            worthiness,
            complexity,
            words = features.word_count,
            "Debate activation evaluated"
        );
        decision
    }

    /// Same as [`should_activate_debate`](Self::should_activate_debate), run
    /// on the blocking pool.
    pub async fn should_activate_debate_async(
        &self,
        query: impl Into<String>,
        context: Option<ActivationContext>,
    ) -> DebateActivationDecision {
        let query = query.into();
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.should_activate_debate(&query, context.as_ref()))
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "Debate activation task failed, not activating");
                DebateActivationDecision::inactive(0.0, 0.0, "Debate evaluation failed")
            }
        }
    }

    /// Snapshot of the activation counters.
    pub fn activation_stats(&self) -> ActivationStats {
        sync::lock(&self.inner.stats, "debate stats").clone()
    }

    fn record(&self, decision: &DebateActivationDecision) {
        let mut stats = sync::lock(&self.inner.stats, "debate stats");
        stats.evaluations += 1;
        if decision.should_activate() {
            stats.activations += 1;
            *stats.by_protocol.entry(decision.protocol()).or_insert(0) += 1;
        }
    }
}

impl Default for DebateActivationEngine {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl std::fmt::Debug for DebateActivationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebateActivationEngine")
            .field("activation_threshold", &self.inner.config.activation_threshold)
            .finish_non_exhaustive()
    }
}

fn flag(on: bool, weight: f64) -> f64 {
    if on { weight } else { 0.0 }
}

fn cap(score: f64) -> f64 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DebateActivationEngine {
        DebateActivationEngine::default()
    }

    #[test]
    fn docker_or_kubernetes_activates() {
        let d = engine().should_activate_debate("Should I use Docker or Kubernetes?", None);
        assert!(d.should_activate());
        assert!(matches!(d.protocol(), DebateProtocol::Sequential | DebateProtocol::Judge));
        assert!(d.debate_worthiness() >= 0.5);
        assert!((d.debate_worthiness() - 0.75).abs() < 1e-9);
        assert!((d.confidence() - d.debate_worthiness()).abs() < 1e-12);
        assert!(d.reasoning().contains("comparison"));
    }

    #[test]
    fn greeting_does_not_activate() {
        let d = engine().should_activate_debate("Hello, how are you?", None);
        assert!(!d.should_activate());
        assert_eq!(d.protocol(), DebateProtocol::None);
        assert!((d.confidence() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn empty_query_degrades() {
        let d = engine().should_activate_debate("", None);
        assert!(!d.should_activate());
        assert_eq!(d.debate_worthiness(), 0.0);
        assert_eq!(d.confidence(), 1.0);
        assert!(d.reasoning().contains("no debate signals"));
    }

    #[test]
    fn long_comparison_goes_to_judge() {
        let q = "Compare PostgreSQL versus MongoDB and explain which one we should choose \
                 given the trade-offs for our reporting workload and analyze the migration impact?";
        let e = engine();
        let features = e.extract_features(q);
        assert!(e.complexity(&features) > 0.7);
        let d = e.should_activate_debate(q, None);
        assert_eq!(d.protocol(), DebateProtocol::Judge);
    }

    #[test]
    fn protocol_priority_without_decision() {
        let e = engine();
        let analysis = e.should_activate_debate(
            "Analyze the trade-offs of our caching layer in the API gateway and tell me why it is so slow under load?",
            None,
        );
        assert!(analysis.should_activate());
        assert_eq!(analysis.protocol(), DebateProtocol::Parallel);
    }

    #[test]
    fn activation_consistency_over_many_queries() {
        let e = engine();
        let queries = [
            "",
            "hi",
            "Why?",
            "Which is better, A or B?",
            "Explain the reasons behind this design",
            "debate the trade-offs",
            "Should we migrate?",
            "List files",
        ];
        for q in queries {
            let d = e.should_activate_debate(q, None);
            assert_eq!(d.should_activate(), d.protocol() != DebateProtocol::None, "{q}");
            if d.should_activate() {
                assert!(!d.reasoning().is_empty());
            }
        }
    }

    #[test]
    fn explicit_request_forces_activation() {
        let ctx = ActivationContext {
            explicit_request: true,
            ..Default::default()
        };
        let d = engine().should_activate_debate("List files", Some(&ctx));
        assert!(d.should_activate());
        assert!(d.reasoning().contains("explicit request"));
    }

    #[test]
    fn conflicting_evidence_adds_bonus() {
        let e = engine();
        let features = e.extract_features("Why is the build slow?");
        let plain = e.worthiness(&features, None);
        let ctx = ActivationContext {
            conflicting_evidence: true,
            ..Default::default()
        };
        let boosted = e.worthiness(&features, Some(&ctx));
        assert!((boosted - plain - 0.1).abs() < 1e-9);
    }

    #[test]
    fn stats_count_evaluations() {
        let e = engine();
        e.should_activate_debate("Should I use Docker or Kubernetes?", None);
        e.should_activate_debate("Hello", None);
        let stats = e.clone().activation_stats();
        assert_eq!(stats.evaluations, 2);
        assert_eq!(stats.activations, 1);
        assert_eq!(stats.by_protocol.get(&DebateProtocol::Sequential), Some(&1));
        assert!((stats.activation_rate() - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn async_matches_sync() {
        let e = engine();
        let q = "Which database should we pick for analytics?";
        let sync = e.should_activate_debate(q, None);
        let async_decision = e.should_activate_debate_async(q, None).await;
        assert_eq!(sync, async_decision);
    }
}
