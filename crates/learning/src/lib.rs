//! # Baton Learning
//!
//! Cross-agent learning and coordination: a shared knowledge base, a
//! per-agent performance ledger with bottleneck detection, and a
//! coordinator that routes work among agent specializations.
//!
//! Nothing here is global. Construct a [`KnowledgeBase`] and a
//! [`PerformanceMonitor`], share them via `Arc`, and hand them to the
//! [`AdvancedCoordinator`].

pub mod coordinator;
pub mod knowledge;
pub mod monitor;

pub use coordinator::{AdvancedCoordinator, AgentProfile, CoordinationTask, ExecutionPlan, TaskAssignment};
pub use knowledge::{KnowledgeBase, KnowledgeContent, KnowledgeItem};
pub use monitor::{AgentPerformance, Bottleneck, BottleneckKind, MetricStats, PerformanceMonitor};
