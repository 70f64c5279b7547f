//! Quality metrics for one response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Weights of [`QualityMetrics::overall_score`].
pub const SEMANTIC_WEIGHT: f64 = 0.30;
pub const RELEVANCE_WEIGHT: f64 = 0.25;
pub const SOLUTION_WEIGHT: f64 = 0.25;
pub const TONE_WEIGHT: f64 = 0.10;
pub const FORMAT_WEIGHT: f64 = 0.10;

/// Five independent scores in [0, 1]. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub format_compliance: f64,
    pub semantic_correctness: f64,
    pub relevance: f64,
    pub tone: f64,
    pub solution_quality: f64,
    pub evaluated_at: DateTime<Utc>,
}

impl QualityMetrics {
    /// Build metrics from raw scores, clamping each into [0, 1].
    pub fn new(format: f64, semantic: f64, relevance: f64, tone: f64, solution: f64) -> Self {
        Self {
            format_compliance: unit(format),
            semantic_correctness: unit(semantic),
            relevance: unit(relevance),
            tone: unit(tone),
            solution_quality: unit(solution),
            evaluated_at: Utc::now(),
        }
    }

    /// Every axis at the midpoint.
    pub fn neutral() -> Self {
        Self::new(0.5, 0.5, 0.5, 0.5, 0.5)
    }

    /// Weighted sum: semantic 0.30, relevance 0.25, solution 0.25,
    /// tone 0.10, format 0.10.
    pub fn overall_score(&self) -> f64 {
        SEMANTIC_WEIGHT * self.semantic_correctness
            + RELEVANCE_WEIGHT * self.relevance
            + SOLUTION_WEIGHT * self.solution_quality
            + TONE_WEIGHT * self.tone
            + FORMAT_WEIGHT * self.format_compliance
    }

    /// `(threshold name, value)` pairs, overall last.
    pub fn values(&self) -> [(&'static str, f64); 6] {
        [
            ("format", self.format_compliance),
            ("semantic", self.semantic_correctness),
            ("relevance", self.relevance),
            ("tone", self.tone),
            ("solution", self.solution_quality),
            ("overall", self.overall_score()),
        ]
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let total = SEMANTIC_WEIGHT + RELEVANCE_WEIGHT + SOLUTION_WEIGHT + TONE_WEIGHT + FORMAT_WEIGHT;
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overall_is_weighted() {
        let m = QualityMetrics::new(0.0, 1.0, 0.0, 0.0, 0.0);
        assert!((m.overall_score() - 0.30).abs() < 1e-12);
        assert!((QualityMetrics::neutral().overall_score() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn inputs_are_clamped() {
        let m = QualityMetrics::new(2.0, -1.0, f64::NAN, 0.5, 0.5);
        assert_eq!(m.format_compliance, 1.0);
        assert_eq!(m.semantic_correctness, 0.0);
        assert_eq!(m.relevance, 0.0);
    }

    #[test]
    fn values_end_with_overall() {
        let m = QualityMetrics::neutral();
        let values = m.values();
        assert_eq!(values[5].0, "overall");
        assert_eq!(values[0], ("format", 0.5));
    }
}
