//! Self-tuning pass/fail thresholds.

use std::collections::VecDeque;

use baton_config::{QualityConfig, ThresholdBounds};
use baton_core::text::{mean, std_dev};
use serde::Serialize;

/// A cutoff that drifts toward recent observed performance.
///
/// `current_value` stays within `[min_value, max_value]` and only changes
/// through [`update`](Self::update).
#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    name: String,
    current_value: f64,
    min_value: f64,
    max_value: f64,
    history: VecDeque<f64>,
    history_size: usize,
    adjustment_rate: f64,
    min_samples: usize,
    stdev_factor: f64,
}

/// Read-only view of a threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdStatus {
    pub name: String,
    pub current_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub samples: usize,
    pub recent_mean: Option<f64>,
}

impl AdaptiveThreshold {
    pub fn new(name: impl Into<String>, bounds: ThresholdBounds, config: &QualityConfig) -> Self {
        let min_value = bounds.min.min(bounds.max);
        let max_value = bounds.max.max(bounds.min);
        Self {
            name: name.into(),
            current_value: bounds.initial.clamp(min_value, max_value),
            min_value,
            max_value,
            history: VecDeque::with_capacity(config.history_size),
            history_size: config.history_size.max(1),
            adjustment_rate: config.adjustment_rate.clamp(0.0, 1.0),
            min_samples: config.min_samples.max(1),
            stdev_factor: config.stdev_factor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_value(&self) -> f64 {
        self.current_value
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn samples(&self) -> usize {
        self.history.len()
    }

    pub fn is_satisfied(&self, value: f64) -> bool {
        value >= self.current_value
    }

    /// Record an observation and move toward `mean - k·stdev` once enough
    /// samples exist. NaN observations are ignored.
    pub fn update(&mut self, observation: f64) {
        if observation.is_nan() {
            return;
        }
        self.history.push_back(observation.clamp(0.0, 1.0));
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
        if self.history.len() < self.min_samples {
            return;
        }

        let values = self.history.make_contiguous();
        let (Some(m), Some(sd)) = (mean(values), std_dev(values)) else {
            return;
        };
        let target = (m - self.stdev_factor * sd).clamp(self.min_value, self.max_value);
        self.current_value += self.adjustment_rate * (target - self.current_value);
        self.current_value = self.current_value.clamp(self.min_value, self.max_value);
    }

    pub fn status(&self) -> ThresholdStatus {
        let values: Vec<f64> = self.history.iter().copied().collect();
        ThresholdStatus {
            name: self.name.clone(),
            current_value: self.current_value,
            min_value: self.min_value,
            max_value: self.max_value,
            samples: self.history.len(),
            recent_mean: mean(&values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold() -> AdaptiveThreshold {
        AdaptiveThreshold::new("semantic", ThresholdBounds::new(0.5, 0.3, 0.9), &QualityConfig::default())
    }

    #[test]
    fn holds_until_min_samples() {
        let mut t = threshold();
        for _ in 0..19 {
            t.update(0.95);
        }
        assert_eq!(t.current_value(), 0.5);
        t.update(0.95);
        assert!(t.current_value() > 0.5);
    }

    #[test]
    fn moves_by_smoothing_not_jumping() {
        let mut t = threshold();
        for _ in 0..20 {
            t.update(0.8);
        }
        // one step of 5% of the 0.3 gap
        assert!((t.current_value() - 0.515).abs() < 1e-9);
    }

    #[test]
    fn converges_toward_observed_level() {
        let mut t = threshold();
        for _ in 0..500 {
            t.update(0.8);
        }
        assert!((t.current_value() - 0.8).abs() < 0.01);
    }

    #[test]
    fn stays_within_bounds_for_any_sequence() {
        let mut t = threshold();
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        for i in 0..2000 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let value = match i % 3 {
                0 => (seed >> 11) as f64 / (1u64 << 53) as f64,
                1 => 0.0,
                _ => 1.0,
            };
            t.update(value);
            assert!(t.current_value() >= t.min_value() && t.current_value() <= t.max_value());
        }
        assert_eq!(t.samples(), 100);
    }

    #[test]
    fn low_observations_hit_the_floor() {
        let mut t = threshold();
        for _ in 0..1000 {
            t.update(0.0);
        }
        assert!((t.current_value() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn nan_is_ignored() {
        let mut t = threshold();
        t.update(f64::NAN);
        assert_eq!(t.samples(), 0);
    }

    #[test]
    fn satisfied_at_or_above() {
        let t = threshold();
        assert!(t.is_satisfied(0.5));
        assert!(!t.is_satisfied(0.49));
        let status = t.status();
        assert_eq!(status.name, "semantic");
        assert_eq!(status.recent_mean, None);
    }
}
