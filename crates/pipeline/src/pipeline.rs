//! One turn through the control layer.
//!
//! [`ReasoningPipeline::prepare_turn`] runs before the model is called:
//! it budgets the retrieved memories and decides whether to debate.
//! [`ReasoningPipeline::evaluate_turn`] runs after: it scores the answer,
//! assembles the evaluation context and feeds the agent ledger.

use std::sync::Arc;

use baton_config::PipelineConfig;
use baton_context::HandoffOptimizer;
use baton_core::MemoryCandidate;
use baton_debate::{DebateActivationDecision, DebateActivationEngine};
use baton_handoff::{
    ContextSize, DebateContext, EvaluationContext, HandoffPreservationTracker, HandoffType, MemoryContext,
    Metadata, PlanningContext,
};
use baton_learning::monitor::{ERROR_RATE, QUALITY};
use baton_learning::{AdvancedCoordinator, KnowledgeBase, PerformanceMonitor};
use baton_quality::{AdaptiveQualityManager, QualityAssessment, QualityContext};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

/// Output of [`ReasoningPipeline::prepare_turn`].
#[derive(Debug, Clone, Serialize)]
pub struct TurnPreparation {
    /// Every retrieved memory plus the budgeted selection.
    pub memory: Arc<MemoryContext>,
    pub debate: DebateActivationDecision,
}

impl TurnPreparation {
    /// The budgeted memory text to place in the prompt.
    pub fn prompt_context(&self) -> String {
        self.memory
            .optimization
            .as_ref()
            .map(|o| o.context_text())
            .unwrap_or_default()
    }
}

/// What the host knows after the model answered.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub query: String,
    pub response: String,
    pub memory: Option<Arc<MemoryContext>>,
    pub planning: Option<Arc<PlanningContext>>,
    pub debate: Option<Arc<DebateContext>>,
    pub quality_context: Option<QualityContext>,
    /// Agent that produced the response, for the performance ledger.
    pub agent_id: Option<String>,
    pub latency_ms: Option<f64>,
}

impl TurnOutcome {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            ..Self::default()
        }
    }

    pub fn with_memory(mut self, memory: Arc<MemoryContext>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_planning(mut self, planning: Arc<PlanningContext>) -> Self {
        self.planning = Some(planning);
        self
    }

    pub fn with_debate(mut self, debate: Arc<DebateContext>) -> Self {
        self.debate = Some(debate);
        self
    }

    pub fn with_quality_context(mut self, context: QualityContext) -> Self {
        self.quality_context = Some(context);
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>, latency_ms: Option<f64>) -> Self {
        self.agent_id = Some(agent_id.into());
        self.latency_ms = latency_ms;
        self
    }
}

/// Every control-layer component wired from one [`PipelineConfig`].
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct ReasoningPipeline {
    config: Arc<PipelineConfig>,
    optimizer: HandoffOptimizer,
    debate: DebateActivationEngine,
    quality: AdaptiveQualityManager,
    tracker: Arc<HandoffPreservationTracker>,
    coordinator: Arc<AdvancedCoordinator>,
}

impl ReasoningPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_knowledge_base(config, Arc::new(KnowledgeBase::new()))
    }

    /// Build around an existing (for example restored) knowledge base.
    pub fn with_knowledge_base(config: PipelineConfig, knowledge: Arc<KnowledgeBase>) -> Self {
        let monitor = Arc::new(PerformanceMonitor::new(config.learning.clone()));
        let coordinator = Arc::new(AdvancedCoordinator::new(monitor, knowledge, config.learning.clone()));
        let pipeline = Self {
            optimizer: HandoffOptimizer::from_config(&config),
            debate: DebateActivationEngine::from_config(&config),
            quality: AdaptiveQualityManager::from_config(&config),
            tracker: Arc::new(HandoffPreservationTracker::new()),
            coordinator,
            config: Arc::new(config),
        };
        info!(
            activation_threshold = pipeline.config.debate.activation_threshold,
            default_max_length = pipeline.config.optimizer.default_max_length,
            "Reasoning pipeline ready"
        );
        pipeline
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn optimizer(&self) -> &HandoffOptimizer {
        &self.optimizer
    }

    pub fn debate_engine(&self) -> &DebateActivationEngine {
        &self.debate
    }

    pub fn quality_manager(&self) -> &AdaptiveQualityManager {
        &self.quality
    }

    pub fn tracker(&self) -> &Arc<HandoffPreservationTracker> {
        &self.tracker
    }

    pub fn coordinator(&self) -> &Arc<AdvancedCoordinator> {
        &self.coordinator
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        self.coordinator.knowledge()
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        self.coordinator.monitor()
    }

    /// Budget `memories` for `query` and decide whether to debate.
    pub fn prepare_turn(&self, query: &str, memories: &[MemoryCandidate], max_length: usize) -> TurnPreparation {
        let optimization = self.optimizer.optimize_memory_context(memories, query, max_length);
        let debate = self.debate.should_activate_debate(query, None);
        let memory = MemoryContext::new(query, memories.to_vec()).with_optimization(optimization);
        self.finish_preparation(memory, debate)
    }

    /// [`prepare_turn`](Self::prepare_turn) with both stages on the
    /// blocking pool, concurrently.
    pub async fn prepare_turn_async(
        &self,
        query: impl Into<String>,
        memories: impl Into<Arc<[MemoryCandidate]>>,
        max_length: usize,
    ) -> TurnPreparation {
        let query = query.into();
        let memories: Arc<[MemoryCandidate]> = memories.into();
        let (optimization, debate) = tokio::join!(
            self.optimizer
                .optimize_memory_context_async(Arc::clone(&memories), query.clone(), max_length),
            self.debate.should_activate_debate_async(query.clone(), None),
        );
        let memory = MemoryContext::new(query, memories.to_vec()).with_optimization(optimization);
        self.finish_preparation(memory, debate)
    }

    fn finish_preparation(&self, memory: MemoryContext, debate: DebateActivationDecision) -> TurnPreparation {
        let (kept, dropped, compressed) = memory
            .optimization
            .as_ref()
            .map_or((0, 0, 0), |o| (o.total_length, o.dropped_count, o.compressed_count));
        let metadata = Metadata::from([
            ("dropped".to_string(), json!(dropped)),
            ("compressed".to_string(), json!(compressed)),
            ("debate".to_string(), json!(debate.should_activate())),
        ]);
        self.tracker.record_handoff(
            HandoffType::MemoryRetrievalToPlanning,
            memory.content_size(),
            kept,
            metadata,
        );
        debug!(
            memories = memory.memories.len(),
            kept,
            debate = debate.should_activate(),
            protocol = %debate.protocol(),
            "Turn prepared"
        );
        TurnPreparation {
            memory: Arc::new(memory),
            debate,
        }
    }

    /// Score the answer and assemble its evaluation context.
    pub fn evaluate_turn(&self, outcome: TurnOutcome) -> EvaluationContext {
        let assessment = self
            .quality
            .evaluate_quality(&outcome.query, &outcome.response, outcome.quality_context.as_ref());
        self.finish_evaluation(outcome, assessment)
    }

    /// [`evaluate_turn`](Self::evaluate_turn) with scoring on the blocking
    /// pool.
    pub async fn evaluate_turn_async(&self, mut outcome: TurnOutcome) -> EvaluationContext {
        let assessment = self
            .quality
            .evaluate_quality_async(
                outcome.query.clone(),
                outcome.response.clone(),
                outcome.quality_context.take(),
            )
            .await;
        self.finish_evaluation(outcome, assessment)
    }

    fn finish_evaluation(&self, outcome: TurnOutcome, assessment: QualityAssessment) -> EvaluationContext {
        if let Some(agent) = &outcome.agent_id {
            match outcome.latency_ms {
                Some(latency) => self.coordinator.record_outcome(
                    agent,
                    latency,
                    assessment.overall_score,
                    assessment.meets_thresholds,
                ),
                None => {
                    let monitor = self.coordinator.monitor();
                    monitor.record_metric(agent, QUALITY, assessment.overall_score);
                    monitor.record_metric(agent, ERROR_RATE, if assessment.meets_thresholds { 0.0 } else { 1.0 });
                }
            }
        }

        let mut evaluation = EvaluationContext::new(outcome.query, outcome.response).with_assessment(assessment);
        if let Some(memory) = outcome.memory {
            evaluation = evaluation.with_memory(memory);
        }
        if let Some(planning) = outcome.planning {
            evaluation = evaluation.with_planning(planning);
        }
        if let Some(debate) = outcome.debate {
            evaluation = evaluation.with_debate(debate);
        }
        if let Some(agent) = outcome.agent_id {
            evaluation = evaluation.with_metadata("agent_id", json!(agent));
        }

        let input = evaluation.response.content_size() + evaluation.evidence_size();
        self.tracker.record_handoff(
            HandoffType::ResponseToEvaluation,
            input,
            evaluation.content_size(),
            Metadata::new(),
        );
        debug!(summary = %evaluation.summary(), "Turn evaluated");
        evaluation
    }
}

impl Default for ReasoningPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl std::fmt::Debug for ReasoningPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningPipeline")
            .field("handoffs", &self.tracker.len())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memories() -> Vec<MemoryCandidate> {
        vec![
            MemoryCandidate::new("Docker packages an application with its dependencies.", 0.9),
            MemoryCandidate::new("Kubernetes schedules containers across a cluster of nodes.", 0.8),
            MemoryCandidate::new("The team deploys twice a week from the main branch.", 0.3),
        ]
    }

    #[test]
    fn preparation_records_memory_handoff() {
        let p = ReasoningPipeline::default();
        let prep = p.prepare_turn("Should I use Docker or Kubernetes?", &memories(), 2000);
        assert!(prep.debate.should_activate());
        assert_eq!(prep.memory.memories.len(), 3);
        assert!(prep.prompt_context().contains("Kubernetes"));

        let records = p.tracker().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].handoff_type, HandoffType::MemoryRetrievalToPlanning);
        assert_eq!(records[0].preservation_ratio, 1.0);
    }

    #[test]
    fn evaluation_is_lossless_and_feeds_ledger() {
        let p = ReasoningPipeline::default();
        let prep = p.prepare_turn("How do I list Docker containers?", &memories(), 2000);
        let outcome = TurnOutcome::new(
            "How do I list Docker containers?",
            "Run `docker ps` to list running Docker containers, or `docker ps -a` to include stopped ones.",
        )
        .with_memory(Arc::clone(&prep.memory))
        .with_agent("ops", Some(420.0));

        let evaluation = p.evaluate_turn(outcome);
        assert!(evaluation.assessment.is_some());
        assert!(Arc::ptr_eq(evaluation.memory.as_ref().unwrap(), &prep.memory));
        assert_eq!(evaluation.metadata["agent_id"], "ops");

        let last = p.tracker().records().pop().unwrap();
        assert_eq!(last.handoff_type, HandoffType::ResponseToEvaluation);
        assert_eq!(last.preservation_ratio, 1.0);

        let perf = p.monitor().get_agent_performance("ops").unwrap();
        assert_eq!(perf.metrics["latency_ms"].last, 420.0);
        assert!(perf.mean(QUALITY).is_some());
    }

    #[test]
    fn agent_without_latency_skips_latency_metric() {
        let p = ReasoningPipeline::default();
        p.evaluate_turn(TurnOutcome::new("What is Rust?", "Rust is a systems language.").with_agent("a", None));
        let perf = p.monitor().get_agent_performance("a").unwrap();
        assert!(perf.mean("latency_ms").is_none());
        assert!(perf.mean(ERROR_RATE).is_some());
    }

    #[tokio::test]
    async fn async_preparation_matches_sync() {
        let p = ReasoningPipeline::default();
        let q = "Should I use Docker or Kubernetes?";
        let sync = p.prepare_turn(q, &memories(), 120);
        let async_ = p.prepare_turn_async(q, memories(), 120).await;
        assert_eq!(sync.prompt_context(), async_.prompt_context());
        assert_eq!(sync.debate.protocol(), async_.debate.protocol());
        assert_eq!(p.tracker().len(), 2);
    }
}
