//! # Baton Quality
//!
//! Scores a generated response on five axes (format, semantic correctness,
//! relevance, tone, solution quality) and gates it against self-tuning
//! thresholds.
//!
//! ## Threshold adaptation
//!
//! Every observation is pushed into a bounded history. Once a threshold has
//! enough samples it moves a small fraction of the way toward
//! `mean - 0.5·stdev` of its history, clamped to its hard bounds, so it
//! follows observed performance without ever jumping.
//!
//! ## Drift
//!
//! The manager compares the mean overall score of the latest window against
//! the one before it, at most once per check interval. A large relative
//! change sets an advisory flag; evaluation is never blocked.

pub mod assessors;
pub mod manager;
pub mod metrics;
pub mod threshold;

pub use assessors::{Assessors, QualityContext};
pub use manager::{
    AdaptiveQualityManager, DriftReport, FeedbackCalibration, FeedbackRecord, PerformanceSample,
    QualityAssessment,
};
pub use metrics::QualityMetrics;
pub use threshold::{AdaptiveThreshold, ThresholdStatus};
