//! # Baton Handoff
//!
//! Structured containers that carry a stage's complete output across a
//! pipeline boundary (memory retrieval → planning → debate → evaluation),
//! plus a tracker that measures how much survives each crossing.
//!
//! Each container exposes a full-fidelity view (every field, nothing
//! truncated), a structured JSON view for machine consumption, and a short
//! summary for logs. Downstream contexts hold upstream ones by `Arc`, so an
//! [`EvaluationContext`] can be audited back to the exact evidence, plan and
//! deliberation behind an answer.

pub mod debate;
pub mod evaluation;
pub mod memory;
pub mod planning;
pub mod tracker;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use debate::{DebateArgument, DebateContext, DebateRound};
pub use evaluation::EvaluationContext;
pub use memory::MemoryContext;
pub use planning::{PlanStep, PlanningContext};
pub use tracker::{HandoffPreservationTracker, HandoffRecord, PreservationReport, PreservationStats};

/// Free-form metadata attached to a context or handoff record.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Characters of summary previews.
const PREVIEW_CHARS: usize = 80;

/// Content size of a context, in characters, for preservation tracking.
pub trait ContextSize {
    fn content_size(&self) -> usize;
}

impl ContextSize for str {
    fn content_size(&self) -> usize {
        baton_core::char_len(self)
    }
}

impl ContextSize for String {
    fn content_size(&self) -> usize {
        baton_core::char_len(self)
    }
}

impl<T: ContextSize + ?Sized> ContextSize for std::sync::Arc<T> {
    fn content_size(&self) -> usize {
        (**self).content_size()
    }
}

/// A boundary crossing between two stages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffType {
    MemoryRetrievalToPlanning,
    PlanningToDebate,
    DebateToEvaluation,
    PlanningToEvaluation,
    ResponseToEvaluation,
    Custom(String),
}

impl HandoffType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::MemoryRetrievalToPlanning => "memory_retrieval_to_planning",
            Self::PlanningToDebate => "planning_to_debate",
            Self::DebateToEvaluation => "debate_to_evaluation",
            Self::PlanningToEvaluation => "planning_to_evaluation",
            Self::ResponseToEvaluation => "response_to_evaluation",
            Self::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for HandoffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any of the four stage contexts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "context", rename_all = "snake_case")]
pub enum HandoffContext {
    Memory(std::sync::Arc<MemoryContext>),
    Planning(std::sync::Arc<PlanningContext>),
    Debate(std::sync::Arc<DebateContext>),
    Evaluation(std::sync::Arc<EvaluationContext>),
}

impl HandoffContext {
    pub fn summary(&self) -> String {
        match self {
            Self::Memory(c) => c.summary(),
            Self::Planning(c) => c.summary(),
            Self::Debate(c) => c.summary(),
            Self::Evaluation(c) => c.summary(),
        }
    }

    /// The structured view of whichever context this is.
    pub fn structured(&self) -> serde_json::Value {
        match self {
            Self::Memory(c) => c.get_structured_memory_context(),
            Self::Planning(c) => c.get_structured_plan_context(),
            Self::Debate(c) => c.get_structured_debate_context(),
            Self::Evaluation(c) => c.get_full_evaluation_context(),
        }
    }
}

impl ContextSize for HandoffContext {
    fn content_size(&self) -> usize {
        match self {
            Self::Memory(c) => c.content_size(),
            Self::Planning(c) => c.content_size(),
            Self::Debate(c) => c.content_size(),
            Self::Evaluation(c) => c.content_size(),
        }
    }
}

/// Abbreviated text for summaries.
fn preview(text: &str) -> String {
    let cut = baton_core::text::truncate_chars(text, PREVIEW_CHARS);
    if cut.len() < text.len() {
        format!("{cut}…")
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn handoff_type_names() {
        assert_eq!(HandoffType::MemoryRetrievalToPlanning.to_string(), "memory_retrieval_to_planning");
        assert_eq!(HandoffType::Custom("tool_call".into()).as_str(), "tool_call");
    }

    #[test]
    fn preview_abbreviates_long_text() {
        let long = "x".repeat(200);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 1);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn wrapped_context_delegates() {
        let memory = Arc::new(MemoryContext::new("q", vec![baton_core::MemoryCandidate::new("abc", 0.5)]));
        let wrapped = HandoffContext::Memory(Arc::clone(&memory));
        assert_eq!(wrapped.content_size(), memory.content_size());
        assert_eq!(wrapped.summary(), memory.summary());
        let json = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(json["kind"], "memory");
    }
}
