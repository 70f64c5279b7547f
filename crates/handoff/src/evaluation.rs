//! Response → evaluation, the final context of a turn.

use std::sync::Arc;

use baton_quality::QualityAssessment;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::debate::DebateContext;
use crate::memory::MemoryContext;
use crate::planning::PlanningContext;
use crate::{preview, ContextSize, Metadata};

/// The answer under evaluation and, by reference, everything that fed it.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationContext {
    pub query: String,
    pub response: String,
    pub memory: Option<Arc<MemoryContext>>,
    pub planning: Option<Arc<PlanningContext>>,
    pub debate: Option<Arc<DebateContext>>,
    pub assessment: Option<QualityAssessment>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            memory: None,
            planning: None,
            debate: None,
            assessment: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
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

    pub fn with_assessment(mut self, assessment: QualityAssessment) -> Self {
        self.assessment = Some(assessment);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Nested structured view including every upstream context in full.
    pub fn get_full_evaluation_context(&self) -> serde_json::Value {
        json!({
            "query": self.query,
            "response": self.response,
            "assessment": self.assessment,
            "memory": self.memory.as_ref().map(|m| m.get_structured_memory_context()),
            "planning": self.planning.as_ref().map(|p| p.get_structured_plan_context()),
            "debate": self.debate.as_ref().map(|d| d.get_structured_debate_context()),
            "evidence_size": self.evidence_size(),
            "metadata": self.metadata,
            "created_at": self.created_at,
        })
    }

    /// Characters of upstream evidence (memory, plan, debate) behind the
    /// response.
    pub fn evidence_size(&self) -> usize {
        self.memory.as_ref().map_or(0, |m| m.content_size())
            + self.planning.as_ref().map_or(0, |p| p.content_size())
            + self.debate.as_ref().map_or(0, |d| d.content_size())
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(m) = &self.memory {
            parts.push(format!("{} memories", m.memories.len()));
        }
        if let Some(p) = &self.planning {
            parts.push(format!("{} plan steps", p.steps.len()));
        }
        if let Some(d) = &self.debate {
            parts.push(format!("{} debate arguments", d.argument_count()));
        }
        let upstream = if parts.is_empty() {
            "no upstream context".to_string()
        } else {
            parts.join(", ")
        };
        let verdict = match &self.assessment {
            Some(a) => format!(
                "overall {:.2}, {}",
                a.overall_score,
                if a.meets_thresholds { "passed" } else { "failed" }
            ),
            None => "not scored".to_string(),
        };
        format!(
            "EvaluationContext: \"{}\" ({}; {})",
            preview(&self.query),
            upstream,
            verdict
        )
    }
}

impl ContextSize for EvaluationContext {
    fn content_size(&self) -> usize {
        self.response.content_size() + self.evidence_size()
    }
}
