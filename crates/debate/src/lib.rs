//! # Baton Debate
//!
//! Decides whether a query deserves multi-perspective deliberation and which
//! protocol the external debate executor should run. This crate only
//! decides; it never generates arguments.

pub mod decision;
pub mod engine;
pub mod features;

pub use decision::{ActivationContext, DebateActivationDecision, DebateProtocol};
pub use engine::{ActivationStats, DebateActivationEngine};
pub use features::QueryFeatures;
