//! # Baton
//!
//! A control layer for multi-stage LLM reasoning pipelines. It sits between
//! a host agent runtime and its model calls and decides, per turn:
//!
//! - which retrieved memories fit the context budget, compressing where it
//!   pays ([`context`]);
//! - whether the query deserves a multi-agent debate, and which protocol
//!   ([`debate`]);
//! - whether the answer is good enough, against thresholds that adapt to
//!   recent history and watch for drift ([`quality`]).
//!
//! Stage outputs cross boundaries as full-fidelity [`handoff`] contexts, and
//! [`learning`] keeps a shared knowledge base and per-agent ledger.
//!
//! ```no_run
//! use baton::{ReasoningPipeline, TurnOutcome};
//! use baton::MemoryCandidate;
//!
//! let pipeline = ReasoningPipeline::default();
//! let memories = vec![MemoryCandidate::new("Docker packages apps into images.", 0.9)];
//! let prep = pipeline.prepare_turn("Should I use Docker or Kubernetes?", &memories, 2000);
//! // ... call the model with prep.prompt_context(), debating if prep.debate says so ...
//! let evaluation = pipeline.evaluate_turn(
//!     TurnOutcome::new("Should I use Docker or Kubernetes?", "Start with Docker Compose.")
//!         .with_memory(prep.memory.clone()),
//! );
//! println!("{}", evaluation.summary());
//! ```

pub mod pipeline;
pub mod telemetry;

pub use baton_config as config;
pub use baton_context as context;
pub use baton_debate as debate;
pub use baton_handoff as handoff;
pub use baton_learning as learning;
pub use baton_quality as quality;

pub use baton_core::{Error, MemoryCandidate, Result};
pub use pipeline::{ReasoningPipeline, TurnOutcome, TurnPreparation};
