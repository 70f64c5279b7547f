//! Planning → debate / evaluation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::memory::MemoryContext;
use crate::{preview, ContextSize, Metadata};

/// One step produced by the external planner, kept as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Indices of steps this one waits for.
    #[serde(default)]
    pub depends_on: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

impl PlanStep {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            agent: None,
            depends_on: Vec::new(),
            expected_output: None,
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn depends_on(mut self, steps: impl IntoIterator<Item = usize>) -> Self {
        self.depends_on.extend(steps);
        self
    }
}

/// The planner's full output plus the memory context it planned from.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningContext {
    pub goal: String,
    pub steps: Vec<PlanStep>,
    pub reasoning: String,
    pub complexity: f64,
    pub memory: Option<Arc<MemoryContext>>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl PlanningContext {
    pub fn new(goal: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            goal: goal.into(),
            steps,
            reasoning: String::new(),
            complexity: 0.0,
            memory: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_memory(mut self, memory: Arc<MemoryContext>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get_full_plan_context(&self) -> String {
        let mut out = format!("Goal: {}\n", self.goal);
        if !self.reasoning.is_empty() {
            out.push_str(&format!("Reasoning: {}\n", self.reasoning));
        }
        out.push_str(&format!("Complexity: {:.2}\n", self.complexity));
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("\nStep {}: {}", i + 1, step.description));
            if let Some(agent) = &step.agent {
                out.push_str(&format!(" (agent: {agent})"));
            }
            if !step.depends_on.is_empty() {
                let deps: Vec<String> = step.depends_on.iter().map(|d| (d + 1).to_string()).collect();
                out.push_str(&format!(" [after {}]", deps.join(", ")));
            }
            if let Some(expected) = &step.expected_output {
                out.push_str(&format!("\n  Expected: {expected}"));
            }
        }
        out.push('\n');
        out
    }

    pub fn get_structured_plan_context(&self) -> serde_json::Value {
        json!({
            "goal": self.goal,
            "reasoning": self.reasoning,
            "complexity": self.complexity,
            "step_count": self.steps.len(),
            "steps": self.steps,
            "memory": self.memory.as_ref().map(|m| m.get_structured_memory_context()),
            "metadata": self.metadata,
            "created_at": self.created_at,
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "PlanningContext: {} steps for \"{}\" (complexity {:.2}{})",
            self.steps.len(),
            preview(&self.goal),
            self.complexity,
            if self.memory.is_some() { ", with memory" } else { "" }
        )
    }
}

impl ContextSize for PlanningContext {
    fn content_size(&self) -> usize {
        let steps: usize = self
            .steps
            .iter()
            .map(|s| s.description.content_size() + s.expected_output.as_ref().map_or(0, |e| e.content_size()))
            .sum();
        self.goal.content_size() + self.reasoning.content_size() + steps
    }
}
