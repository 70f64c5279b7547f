//! Per-agent performance ledger and bottleneck detection.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use baton_config::LearningConfig;
use baton_core::sync;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Well-known metric names.
pub const LATENCY_MS: &str = "latency_ms";
pub const QUALITY: &str = "quality";
pub const ERROR_RATE: &str = "error_rate";

/// Running statistics of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
}

impl MetricStats {
    fn first(value: f64) -> Self {
        Self {
            count: 1,
            mean: value,
            min: value,
            max: value,
            last: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last = value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentPerformance {
    pub agent_id: String,
    pub metrics: BTreeMap<String, MetricStats>,
    pub updated_at: DateTime<Utc>,
}

impl AgentPerformance {
    pub fn mean(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|s| s.mean)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BottleneckKind {
    HighLatency,
    LowQuality,
    HighErrorRate,
}

/// One violated performance rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bottleneck {
    pub agent_id: String,
    pub kind: BottleneckKind,
    pub metric: String,
    pub observed: f64,
    pub limit: f64,
    pub message: String,
}

#[derive(Debug)]
struct AgentLedger {
    metrics: BTreeMap<String, MetricStats>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    config: LearningConfig,
    agents: RwLock<HashMap<String, AgentLedger>>,
}

impl PerformanceMonitor {
    pub fn new(config: LearningConfig) -> Self {
        Self {
            config,
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Add one observation. Non-finite values are ignored.
    pub fn record_metric(&self, agent_id: &str, metric: &str, value: f64) {
        if !value.is_finite() {
            return;
        }
        let mut agents = sync::write(&self.agents, "performance ledger");
        let ledger = agents.entry(agent_id.to_string()).or_insert_with(|| AgentLedger {
            metrics: BTreeMap::new(),
            updated_at: Utc::now(),
        });
        match ledger.metrics.get_mut(metric) {
            Some(stats) => stats.push(value),
            None => {
                ledger.metrics.insert(metric.to_string(), MetricStats::first(value));
            }
        }
        ledger.updated_at = Utc::now();
    }

    pub fn get_agent_performance(&self, agent_id: &str) -> Option<AgentPerformance> {
        let agents = sync::read(&self.agents, "performance ledger");
        agents.get(agent_id).map(|ledger| AgentPerformance {
            agent_id: agent_id.to_string(),
            metrics: ledger.metrics.clone(),
            updated_at: ledger.updated_at,
        })
    }

    /// Agents with at least one metric, sorted.
    pub fn agents(&self) -> Vec<String> {
        let mut ids: Vec<String> = sync::read(&self.agents, "performance ledger").keys().cloned().collect();
        ids.sort();
        ids
    }

    /// One record per violated rule, judged on metric means.
    pub fn detect_bottlenecks(&self, agent_id: &str) -> Vec<Bottleneck> {
        let Some(performance) = self.get_agent_performance(agent_id) else {
            return Vec::new();
        };
        let rules = [
            (LATENCY_MS, BottleneckKind::HighLatency, self.config.latency_ceiling_ms, true),
            (QUALITY, BottleneckKind::LowQuality, self.config.quality_floor, false),
            (ERROR_RATE, BottleneckKind::HighErrorRate, self.config.error_rate_ceiling, true),
        ];

        let mut found = Vec::new();
        for (metric, kind, limit, is_ceiling) in rules {
            let Some(observed) = performance.mean(metric) else {
                continue;
            };
            let violated = if is_ceiling { observed > limit } else { observed < limit };
            if violated {
                let relation = if is_ceiling { "above ceiling" } else { "below floor" };
                let message = format!("{agent_id}: mean {metric} {observed:.3} {relation} {limit:.3}");
                warn!(agent = agent_id, metric, observed, limit, "Bottleneck detected");
                found.push(Bottleneck {
                    agent_id: agent_id.to_string(),
                    kind,
                    metric: metric.to_string(),
                    observed,
                    limit,
                    message,
                });
            }
        }
        found
    }

    /// Routing score in [0, 1]: quality × (1 − error rate) discounted by
    /// latency relative to the ceiling. Unmeasured agents score 0.5.
    pub fn performance_score(&self, agent_id: &str) -> f64 {
        let Some(performance) = self.get_agent_performance(agent_id) else {
            return 0.5;
        };
        let quality = performance.mean(QUALITY).unwrap_or(0.5).clamp(0.0, 1.0);
        let error_rate = performance.mean(ERROR_RATE).unwrap_or(0.0).clamp(0.0, 1.0);
        let latency = performance.mean(LATENCY_MS).unwrap_or(0.0).max(0.0);
        let ceiling = self.config.latency_ceiling_ms.max(1.0);
        quality * (1.0 - error_rate) * (ceiling / (ceiling + latency))
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(LearningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_statistics() {
        let m = PerformanceMonitor::default();
        for v in [100.0, 300.0, 200.0] {
            m.record_metric("coder", LATENCY_MS, v);
        }
        let perf = m.get_agent_performance("coder").unwrap();
        let stats = &perf.metrics[LATENCY_MS];
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 200.0).abs() < 1e-9);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 300.0);
        assert_eq!(stats.last, 200.0);
    }

    #[test]
    fn unknown_agent() {
        let m = PerformanceMonitor::default();
        assert!(m.get_agent_performance("ghost").is_none());
        assert!(m.detect_bottlenecks("ghost").is_empty());
    }

    #[test]
    fn non_finite_values_ignored() {
        let m = PerformanceMonitor::default();
        m.record_metric("a", QUALITY, f64::NAN);
        assert!(m.get_agent_performance("a").is_none());
    }

    #[test]
    fn one_bottleneck_per_violated_rule() {
        let m = PerformanceMonitor::default();
        m.record_metric("slow", LATENCY_MS, 9000.0);
        m.record_metric("slow", QUALITY, 0.4);
        m.record_metric("slow", ERROR_RATE, 0.5);
        let found = m.detect_bottlenecks("slow");
        let kinds: Vec<_> = found.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BottleneckKind::HighLatency, BottleneckKind::LowQuality, BottleneckKind::HighErrorRate]
        );
        assert!(found[0].message.contains("above ceiling"));
    }

    #[test]
    fn healthy_agent_has_no_bottlenecks() {
        let m = PerformanceMonitor::default();
        m.record_metric("ok", LATENCY_MS, 800.0);
        m.record_metric("ok", QUALITY, 0.9);
        m.record_metric("ok", ERROR_RATE, 0.0);
        assert!(m.detect_bottlenecks("ok").is_empty());
    }

    #[test]
    fn score_prefers_fast_accurate_agents() {
        let m = PerformanceMonitor::default();
        m.record_metric("good", QUALITY, 0.9);
        m.record_metric("good", LATENCY_MS, 500.0);
        m.record_metric("bad", QUALITY, 0.6);
        m.record_metric("bad", LATENCY_MS, 6000.0);
        m.record_metric("bad", ERROR_RATE, 0.2);
        assert!(m.performance_score("good") > m.performance_score("bad"));
        assert_eq!(m.performance_score("new"), 0.5);
        assert_eq!(m.agents(), vec!["bad", "good"]);
    }
}
