//! Agent registry and work routing.
//!
//! The coordinator only plans: it maps tasks to registered agents and
//! feeds outcomes back into the ledger. Running the tasks is the caller's
//! job.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use baton_config::LearningConfig;
use baton_core::sync;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::knowledge::{KnowledgeBase, KnowledgeContent};
use crate::monitor::{PerformanceMonitor, ERROR_RATE, LATENCY_MS, QUALITY};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentProfile {
    pub id: String,
    pub role: String,
    pub registered_at: DateTime<Utc>,
}

/// A unit of work to route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationTask {
    pub id: String,
    /// Role the task wants, matched case-insensitively.
    pub role: String,
    #[serde(default)]
    pub description: String,
}

impl CoordinationTask {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskAssignment {
    pub task_id: String,
    pub role: String,
    /// `None` only when no agents are registered.
    pub agent_id: Option<String>,
    /// The agent does not have the requested role.
    pub fallback: bool,
}

/// Task → agent mapping. Nothing has been executed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    pub assignments: Vec<TaskAssignment>,
    /// Tasks per agent.
    pub load: BTreeMap<String, usize>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn agent_for(&self, task_id: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|a| a.task_id == task_id)
            .and_then(|a| a.agent_id.as_deref())
    }

    pub fn unassigned(&self) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|a| a.agent_id.is_none())
            .map(|a| a.task_id.as_str())
            .collect()
    }

    pub fn is_fully_assigned(&self) -> bool {
        self.assignments.iter().all(|a| a.agent_id.is_some())
    }
}

pub struct AdvancedCoordinator {
    monitor: Arc<PerformanceMonitor>,
    knowledge: Arc<KnowledgeBase>,
    config: LearningConfig,
    agents: RwLock<BTreeMap<String, AgentProfile>>,
}

impl AdvancedCoordinator {
    pub fn new(monitor: Arc<PerformanceMonitor>, knowledge: Arc<KnowledgeBase>, config: LearningConfig) -> Self {
        Self {
            monitor,
            knowledge,
            config,
            agents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    /// Register (or re-register with a new role) an agent.
    pub fn register_agent(&self, id: impl Into<String>, role: impl Into<String>) {
        let profile = AgentProfile {
            id: id.into(),
            role: role.into(),
            registered_at: Utc::now(),
        };
        info!(agent = %profile.id, role = %profile.role, "Agent registered");
        sync::write(&self.agents, "agent registry").insert(profile.id.clone(), profile);
    }

    pub fn agents(&self) -> Vec<AgentProfile> {
        sync::read(&self.agents, "agent registry").values().cloned().collect()
    }

    /// Ids of agents with `role`, sorted.
    pub fn agents_for_role(&self, role: &str) -> Vec<String> {
        sync::read(&self.agents, "agent registry")
            .values()
            .filter(|a| a.role.eq_ignore_ascii_case(role))
            .map(|a| a.id.clone())
            .collect()
    }

    /// Best agent for `role`: the only match directly, otherwise the highest
    /// performance score with ties broken by id.
    pub fn select_best_agent(&self, role: &str) -> Option<String> {
        let candidates = self.agents_for_role(role);
        match candidates.len() {
            0 => None,
            1 => candidates.into_iter().next(),
            _ => self.best_by_score(candidates),
        }
    }

    fn best_by_score(&self, candidates: Vec<String>) -> Option<String> {
        candidates
            .into_iter()
            .map(|id| (self.monitor.performance_score(&id), id))
            .max_by(|(sa, ia), (sb, ib)| sa.total_cmp(sb).then_with(|| ib.cmp(ia)))
            .map(|(_, id)| id)
    }

    /// Assign every task to the least-loaded agent with the requested role,
    /// falling back to any registered agent.
    pub fn coordinate_parallel_execution(&self, tasks: &[CoordinationTask]) -> ExecutionPlan {
        let registry = self.agents();
        let scores: BTreeMap<String, f64> = registry
            .iter()
            .map(|a| (a.id.clone(), self.monitor.performance_score(&a.id)))
            .collect();
        let mut load: BTreeMap<String, usize> = BTreeMap::new();
        let mut assignments = Vec::with_capacity(tasks.len());

        for task in tasks {
            let matching: Vec<&AgentProfile> =
                registry.iter().filter(|a| a.role.eq_ignore_ascii_case(&task.role)).collect();
            let fallback = matching.is_empty();
            let pool: Vec<&AgentProfile> = if fallback { registry.iter().collect() } else { matching };

            let chosen = pool
                .into_iter()
                .min_by(|a, b| {
                    let la = load.get(&a.id).copied().unwrap_or(0);
                    let lb = load.get(&b.id).copied().unwrap_or(0);
                    let sa = scores.get(&a.id).copied().unwrap_or(0.0);
                    let sb = scores.get(&b.id).copied().unwrap_or(0.0);
                    la.cmp(&lb).then_with(|| sb.total_cmp(&sa)).then_with(|| a.id.cmp(&b.id))
                })
                .map(|a| a.id.clone());

            if let Some(agent) = &chosen {
                *load.entry(agent.clone()).or_insert(0) += 1;
            }
            assignments.push(TaskAssignment {
                task_id: task.id.clone(),
                role: task.role.clone(),
                agent_id: chosen,
                fallback: fallback && !registry.is_empty(),
            });
        }

        debug!(tasks = tasks.len(), agents = registry.len(), "Execution plan built");
        ExecutionPlan {
            assignments,
            load,
            created_at: Utc::now(),
        }
    }

    /// Feed one task outcome into the ledger.
    pub fn record_outcome(&self, agent_id: &str, latency_ms: f64, quality: f64, success: bool) {
        self.monitor.record_metric(agent_id, LATENCY_MS, latency_ms);
        self.monitor.record_metric(agent_id, QUALITY, quality);
        self.monitor
            .record_metric(agent_id, ERROR_RATE, if success { 0.0 } else { 1.0 });
    }

    /// Share a pattern when its quality clears the share floor. Returns the
    /// new knowledge id.
    pub fn share_success_pattern(
        &self,
        agent_id: &str,
        pattern_type: &str,
        content: KnowledgeContent,
        quality: f64,
    ) -> Option<String> {
        if !(quality >= self.config.share_quality_floor) {
            return None;
        }
        Some(self.knowledge.share_knowledge(agent_id, pattern_type, content, quality))
    }
}

impl std::fmt::Debug for AdvancedCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvancedCoordinator")
            .field("agents", &self.agents().len())
            .finish_non_exhaustive()
    }
}
