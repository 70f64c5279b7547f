//! End-to-end tests for the Baton control layer.
//!
//! These drive whole turns through [`ReasoningPipeline`]: memory budgeting,
//! debate gating, quality evaluation, handoff tracking and the agent
//! ledger.

use std::sync::Arc;
use std::time::{Duration, Instant};

use baton::config::PipelineConfig;
use baton::debate::DebateProtocol;
use baton::handoff::{DebateArgument, DebateContext, DebateRound, HandoffType, PlanStep, PlanningContext};
use baton::learning::{CoordinationTask, KnowledgeBase};
use baton::quality::{QualityContext, QualityMetrics};
use baton::{MemoryCandidate, ReasoningPipeline, TurnOutcome};
use serde_json::json;

// ── Fixtures ─────────────────────────────────────────────────────────────

const TOPICS: [&str; 5] = [
    "Docker images bundle an application with its runtime and system libraries.",
    "Kubernetes reconciles desired state by restarting failed pods and rescheduling them.",
    "A service mesh adds mutual TLS and retries between microservices without code changes.",
    "Blue-green deployments keep the previous release warm for instant rollback.",
    "Horizontal pod autoscaling reacts to CPU and custom metrics from Prometheus.",
];

fn memory_pool(n: usize) -> Vec<MemoryCandidate> {
    (0..n)
        .map(|i| {
            let text = format!(
                "Note {i}: {} {} Observed during incident review #{i}.",
                TOPICS[i % TOPICS.len()],
                TOPICS[(i + 2) % TOPICS.len()]
            );
            MemoryCandidate::new(text, 1.0 - (i % 100) as f64 / 100.0).with_source(format!("notes/{i}.md"))
        })
        .collect()
}

fn uniform(v: f64) -> QualityMetrics {
    QualityMetrics::new(v, v, v, v, v)
}

// ── Debate gating ────────────────────────────────────────────────────────

#[test]
fn comparison_query_activates_debate() {
    let pipeline = ReasoningPipeline::default();
    let prep = pipeline.prepare_turn("Should I use Docker or Kubernetes?", &memory_pool(10), 2000);
    assert!(prep.debate.should_activate());
    assert!(matches!(prep.debate.protocol(), DebateProtocol::Sequential | DebateProtocol::Judge));
    assert!(prep.debate.debate_worthiness() >= 0.5);
    assert!(!prep.debate.reasoning().is_empty());
}

#[test]
fn greeting_skips_debate() {
    let pipeline = ReasoningPipeline::default();
    let prep = pipeline.prepare_turn("Hello, how are you?", &[], 2000);
    assert!(!prep.debate.should_activate());
    assert_eq!(prep.debate.protocol(), DebateProtocol::None);
    assert!(prep.prompt_context().is_empty());

    let stats = pipeline.debate_engine().activation_stats();
    assert_eq!(stats.evaluations, 1);
    assert_eq!(stats.activations, 0);
}

// ── Memory budgeting ─────────────────────────────────────────────────────

#[test]
fn five_hundred_memories_fit_the_budget_quickly() {
    let pipeline = ReasoningPipeline::default();
    let memories = memory_pool(500);

    let started = Instant::now();
    let prep = pipeline.prepare_turn(
        "How should we compare Kubernetes autoscaling against blue-green deployments for rollback safety?",
        &memories,
        2000,
    );
    let elapsed = started.elapsed();

    let optimization = prep.memory.optimization.as_ref().unwrap();
    assert!(optimization.optimization_applied);
    assert!(optimization.total_length <= 2000);
    assert!(optimization.dropped_count > 0);
    assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");

    // the full retrieval is still available downstream
    assert_eq!(prep.memory.memories.len(), 500);

    let record = &pipeline.tracker().records()[0];
    assert_eq!(record.handoff_type, HandoffType::MemoryRetrievalToPlanning);
    assert_eq!(record.output_size, optimization.total_length);
    assert!(record.preservation_ratio < 1.0);
}

#[test]
fn empty_compressor_input_is_well_defined() {
    let pipeline = ReasoningPipeline::default();
    let compressed = pipeline.optimizer().compressor().compress_context("", 500);
    assert_eq!(compressed.compressed_content, "");
    assert_eq!(compressed.compression_ratio, 0.0);
}

#[tokio::test]
async fn concurrent_turns_are_independent() {
    let pipeline = ReasoningPipeline::default();
    let memories: Arc<[MemoryCandidate]> = memory_pool(100).into();
    let queries = [
        "Should I use Docker or Kubernetes?",
        "Hello, how are you?",
        "Why does the autoscaler react slowly to Prometheus metrics?",
        "Compare a service mesh versus library-based retries for microservices",
    ];

    let turns = futures::future::join_all(
        queries
            .iter()
            .map(|q| pipeline.prepare_turn_async(*q, Arc::clone(&memories), 1500)),
    )
    .await;

    for (query, turn) in queries.iter().zip(&turns) {
        let expected = pipeline.prepare_turn(query, &memories, 1500);
        assert_eq!(turn.prompt_context(), expected.prompt_context());
        assert_eq!(turn.debate.should_activate(), expected.debate.should_activate());
    }
    assert_eq!(pipeline.tracker().len(), 2 * queries.len());
}

// ── Quality ──────────────────────────────────────────────────────────────

#[test]
fn drift_detected_after_quality_drop() {
    let pipeline = ReasoningPipeline::default();
    let quality = pipeline.quality_manager();
    for _ in 0..25 {
        quality.observe_metrics(uniform(0.9));
    }
    assert!(!quality.drift_detected());
    for _ in 0..25 {
        quality.observe_metrics(uniform(0.3));
    }
    assert!(quality.drift_detected());
}

#[test]
fn empty_answer_scores_below_a_good_one() {
    let pipeline = ReasoningPipeline::default();
    let query = "How do I restart a failed Kubernetes deployment?";
    let good = pipeline.evaluate_turn(
        TurnOutcome::new(
            query,
            "Run `kubectl rollout restart deployment/web`. Kubernetes replaces the pods one at a \
             time, so the deployment stays available while it restarts.",
        )
        .with_quality_context(QualityContext {
            required_terms: vec!["kubectl".into(), "rollout".into()],
            expects_code: false,
        }),
    );
    let empty = pipeline.evaluate_turn(TurnOutcome::new(query, ""));

    let good_score = good.assessment.as_ref().unwrap().overall_score;
    let empty_score = empty.assessment.as_ref().unwrap().overall_score;
    assert!(good_score > empty_score, "{good_score} <= {empty_score}");
    assert_eq!(pipeline.quality_manager().get_recent_performance(10).len(), 2);
}

// ── Full turn ────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_turn_keeps_every_upstream_context() {
    let pipeline = ReasoningPipeline::default();
    pipeline.coordinator().register_agent("planner-1", "planner");
    pipeline.coordinator().register_agent("coder-1", "coder");

    let query = "Should we move session storage from Postgres to Redis?";
    let prep = pipeline.prepare_turn_async(query, memory_pool(20), 1200).await;

    let plan = Arc::new(
        PlanningContext::new(
            query,
            vec![
                PlanStep::new("Measure current session read latency").with_agent("coder-1"),
                PlanStep::new("Prototype Redis-backed sessions").depends_on([0]),
            ],
        )
        .with_memory(Arc::clone(&prep.memory)),
    );
    let debate = Arc::new(
        DebateContext::new(
            query,
            vec![DebateRound {
                round: 1,
                arguments: vec![
                    DebateArgument::new("proponent", "Redis cuts read latency for hot sessions.", 0.8),
                    DebateArgument::new("skeptic", "Postgres already meets the latency target.", 0.6)
                        .with_evidence(["p99 read latency is 4 ms"]),
                ],
            }],
        )
        .with_decision(prep.debate.clone())
        .with_conclusion("Prototype first, decide on measured latency.", 0.7),
    );

    let evaluation = pipeline
        .evaluate_turn_async(
            TurnOutcome::new(query, "Prototype Redis sessions behind a flag and compare p99 latency first.")
                .with_memory(Arc::clone(&prep.memory))
                .with_planning(Arc::clone(&plan))
                .with_debate(Arc::clone(&debate))
                .with_agent("planner-1", Some(850.0)),
        )
        .await;

    assert!(Arc::ptr_eq(evaluation.planning.as_ref().unwrap(), &plan));
    assert!(Arc::ptr_eq(evaluation.debate.as_ref().unwrap(), &debate));
    let full = evaluation.get_full_evaluation_context();
    assert_eq!(full["debate"]["conclusion"], "Prototype first, decide on measured latency.");
    assert_eq!(full["memory"]["memories"].as_array().unwrap().len(), 20);

    let stats = pipeline.tracker().get_preservation_stats();
    assert_eq!(stats.by_type["response_to_evaluation"].mean_ratio, 1.0);
    assert_eq!(stats.overall.unwrap().count, 2);

    let plan = pipeline.coordinator().coordinate_parallel_execution(&[
        CoordinationTask::new("measure", "coder"),
        CoordinationTask::new("write-up", "planner"),
    ]);
    assert_eq!(plan.agent_for("measure"), Some("coder-1"));
    assert_eq!(plan.agent_for("write-up"), Some("planner-1"));
    assert!(pipeline.monitor().get_agent_performance("planner-1").is_some());
}

// ── Learning ─────────────────────────────────────────────────────────────

#[test]
fn knowledge_survives_pipeline_restart() {
    let first = ReasoningPipeline::default();
    let id = first
        .coordinator()
        .share_success_pattern(
            "planner-1",
            "deployment",
            json!({"tip": "Roll out Kubernetes changes behind a canary"})
                .as_object()
                .cloned()
                .unwrap(),
            0.9,
        )
        .unwrap();
    let snapshot = first.knowledge().snapshot().unwrap();

    let restored = Arc::new(KnowledgeBase::from_snapshot(&snapshot));
    let second = ReasoningPipeline::with_knowledge_base(PipelineConfig::default(), restored);
    let hits = second.knowledge().find_relevant("how do we roll out kubernetes safely?", 3);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
}

#[test]
fn configuration_flows_into_components() {
    let config = PipelineConfig::from_toml_str(
        r#"
        [debate]
        activation_threshold = 0.95
        "#,
    )
    .unwrap();
    let pipeline = ReasoningPipeline::new(config);
    let prep = pipeline.prepare_turn("Should I use Docker or Kubernetes?", &[], 2000);
    assert!(!prep.debate.should_activate());
}
