//! The adaptive quality manager.
//!
//! Scores responses, gates them against six self-tuning thresholds, keeps a
//! bounded performance history for drift detection, and logs user feedback
//! next to the predicted quality for offline recalibration.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use baton_config::{KeywordConfig, PipelineConfig, QualityConfig};
use baton_core::sync;
use baton_core::text::mean;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assessors::{Assessors, QualityContext};
use crate::metrics::QualityMetrics;
use crate::threshold::{AdaptiveThreshold, ThresholdStatus};

/// Result of scoring and gating one response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAssessment {
    pub metrics: QualityMetrics,
    pub overall_score: f64,
    /// True iff every threshold was satisfied.
    pub meets_thresholds: bool,
    /// Names of the thresholds that were not satisfied, in evaluation order.
    pub failed_thresholds: Vec<String>,
}

impl QualityAssessment {
    /// Midpoint metrics, not gated. Used when scoring could not run.
    pub fn neutral() -> Self {
        let metrics = QualityMetrics::neutral();
        Self {
            overall_score: metrics.overall_score(),
            metrics,
            meets_thresholds: false,
            failed_thresholds: Vec::new(),
        }
    }
}

/// One entry of the performance history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSample {
    pub overall_score: f64,
    pub meets_thresholds: bool,
    pub metrics: QualityMetrics,
}

/// A user feedback entry correlated with the predicted quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub interaction_id: String,
    /// Stored exactly as given.
    pub feedback: serde_json::Value,
    pub predicted_overall: f64,
    pub metrics: QualityMetrics,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of one drift check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    pub recent_mean: f64,
    pub previous_mean: f64,
    pub relative_change: f64,
    pub drift_detected: bool,
    pub samples: usize,
    pub checked_at: DateTime<Utc>,
}

/// How well predicted quality tracks user feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackCalibration {
    pub records: usize,
    /// Records whose feedback could be read as a rating.
    pub rated: usize,
    pub mean_predicted: Option<f64>,
    pub mean_actual: Option<f64>,
    pub mean_absolute_error: Option<f64>,
}

struct ManagerState {
    /// format, semantic, relevance, tone, solution, overall.
    thresholds: Vec<AdaptiveThreshold>,
    performance: VecDeque<PerformanceSample>,
    feedback: VecDeque<FeedbackRecord>,
    drift_detected: bool,
    last_drift_check: Option<Instant>,
    last_drift_report: Option<DriftReport>,
}

struct ManagerInner {
    assessors: Assessors,
    config: QualityConfig,
    state: Mutex<ManagerState>,
}

/// Scores and gates responses. Clones share thresholds and history.
#[derive(Clone)]
pub struct AdaptiveQualityManager {
    inner: Arc<ManagerInner>,
}

impl AdaptiveQualityManager {
    pub fn new(keywords: &KeywordConfig, config: QualityConfig) -> Self {
        let thresholds = config
            .thresholds
            .entries()
            .into_iter()
            .map(|(name, bounds)| AdaptiveThreshold::new(name, bounds, &config))
            .collect();
        let state = ManagerState {
            thresholds,
            performance: VecDeque::new(),
            feedback: VecDeque::new(),
            drift_detected: false,
            last_drift_check: None,
            last_drift_report: None,
        };
        Self {
            inner: Arc::new(ManagerInner {
                assessors: Assessors::new(keywords),
                config,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.keywords, config.quality.clone())
    }

    pub fn config(&self) -> &QualityConfig {
        &self.inner.config
    }

    /// Score `response`, gate it, and update the thresholds.
    pub fn evaluate_quality(
        &self,
        query: &str,
        response: &str,
        context: Option<&QualityContext>,
    ) -> QualityAssessment {
        let metrics = self.inner.assessors.assess(query, response, context);
        self.observe_metrics(metrics)
    }

    /// Same as [`evaluate_quality`](Self::evaluate_quality), run on the
    /// blocking pool.
    pub async fn evaluate_quality_async(
        &self,
        query: impl Into<String>,
        response: impl Into<String>,
        context: Option<QualityContext>,
    ) -> QualityAssessment {
        let query = query.into();
        let response = response.into();
        let this = self.clone();
        match tokio::task::spawn_blocking(move || {
            this.evaluate_quality(&query, &response, context.as_ref())
        })
        .await
        {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(error = %e, "Quality evaluation task failed, returning neutral assessment");
                QualityAssessment::neutral()
            }
        }
    }

    /// Gate and record metrics computed elsewhere.
    ///
    /// The gate uses the thresholds as they stood before this observation.
    pub fn observe_metrics(&self, metrics: QualityMetrics) -> QualityAssessment {
        let values = metrics.values();
        let overall_score = values[5].1;
        let interval = Duration::from_secs(self.inner.config.drift_check_interval_secs);

        let mut state = sync::lock(&self.inner.state, "quality state");
        let failed_thresholds: Vec<String> = state
            .thresholds
            .iter()
            .zip(values.iter())
            .filter(|(threshold, (_, value))| !threshold.is_satisfied(*value))
            .map(|(threshold, _)| threshold.name().to_string())
            .collect();
        let meets_thresholds = failed_thresholds.is_empty();

        for (threshold, (_, value)) in state.thresholds.iter_mut().zip(values.iter()) {
            threshold.update(*value);
        }

        state.performance.push_back(PerformanceSample {
            overall_score,
            meets_thresholds,
            metrics: metrics.clone(),
        });
        while state.performance.len() > self.inner.config.performance_history_size {
            state.performance.pop_front();
        }

        let due = state
            .last_drift_check
            .is_none_or(|last| last.elapsed() >= interval);
        if due && state.performance.len() >= self.inner.config.drift_min_samples {
            self.run_drift_check(&mut state);
        }
        drop(state);

        debug!(
            overall = overall_score,
            meets_thresholds,
            failed = failed_thresholds.len(),
            "Quality evaluated"
        );

        QualityAssessment {
            metrics,
            overall_score,
            meets_thresholds,
            failed_thresholds,
        }
    }

    /// Run a drift check immediately, ignoring the cadence. `None` when
    /// there are too few samples.
    pub fn check_drift_now(&self) -> Option<DriftReport> {
        let mut state = sync::lock(&self.inner.state, "quality state");
        if state.performance.len() < self.inner.config.drift_min_samples {
            return None;
        }
        self.run_drift_check(&mut state);
        state.last_drift_report.clone()
    }

    pub fn drift_detected(&self) -> bool {
        sync::lock(&self.inner.state, "quality state").drift_detected
    }

    pub fn last_drift_report(&self) -> Option<DriftReport> {
        sync::lock(&self.inner.state, "quality state").last_drift_report.clone()
    }

    /// Log user feedback next to the metrics it refers to. Any JSON value is
    /// accepted and stored unchanged.
    pub fn record_feedback(
        &self,
        interaction_id: impl Into<String>,
        feedback: serde_json::Value,
        metrics: QualityMetrics,
    ) {
        let record = FeedbackRecord {
            interaction_id: interaction_id.into(),
            feedback,
            predicted_overall: metrics.overall_score(),
            metrics,
            recorded_at: Utc::now(),
        };
        let mut state = sync::lock(&self.inner.state, "quality state");
        state.feedback.push_back(record);
        while state.feedback.len() > self.inner.config.feedback_log_size {
            state.feedback.pop_front();
        }
    }

    /// Snapshot of the feedback log, oldest first.
    pub fn feedback_log(&self) -> Vec<FeedbackRecord> {
        sync::lock(&self.inner.state, "quality state").feedback.iter().cloned().collect()
    }

    /// Compare predicted quality with the ratings readable from feedback.
    pub fn feedback_calibration(&self) -> FeedbackCalibration {
        let state = sync::lock(&self.inner.state, "quality state");
        let pairs: Vec<(f64, f64)> = state
            .feedback
            .iter()
            .filter_map(|r| feedback_rating(&r.feedback).map(|actual| (r.predicted_overall, actual)))
            .collect();
        let records = state.feedback.len();
        drop(state);

        let predicted: Vec<f64> = pairs.iter().map(|(p, _)| *p).collect();
        let actual: Vec<f64> = pairs.iter().map(|(_, a)| *a).collect();
        let errors: Vec<f64> = pairs.iter().map(|(p, a)| (p - a).abs()).collect();
        FeedbackCalibration {
            records,
            rated: pairs.len(),
            mean_predicted: mean(&predicted),
            mean_actual: mean(&actual),
            mean_absolute_error: mean(&errors),
        }
    }

    pub fn get_threshold_status(&self) -> Vec<ThresholdStatus> {
        sync::lock(&self.inner.state, "quality state")
            .thresholds
            .iter()
            .map(AdaptiveThreshold::status)
            .collect()
    }

    /// The latest `n` performance samples, oldest first.
    pub fn get_recent_performance(&self, n: usize) -> Vec<PerformanceSample> {
        let state = sync::lock(&self.inner.state, "quality state");
        let skip = state.performance.len().saturating_sub(n);
        state.performance.iter().skip(skip).cloned().collect()
    }

    fn run_drift_check(&self, state: &mut ManagerState) {
        let window = self.inner.config.drift_window;
        let samples = state.performance.len();
        if window == 0 || samples < 2 * window {
            return;
        }
        let scores: Vec<f64> = state
            .performance
            .iter()
            .skip(samples - 2 * window)
            .map(|s| s.overall_score)
            .collect();
        let (previous, recent) = scores.split_at(window);
        let (Some(previous_mean), Some(recent_mean)) = (mean(previous), mean(recent)) else {
            return;
        };

        let diff = (recent_mean - previous_mean).abs();
        let fallback = if diff > 0.0 { 1.0 } else { 0.0 };
        let relative_change = baton_core::safe_ratio(diff, previous_mean, fallback);
        let drift = relative_change > self.inner.config.drift_relative_threshold;

        if drift {
            warn!(
                recent = recent_mean,
                previous = previous_mean,
                change = relative_change,
                "Quality drift detected"
            );
        } else if state.drift_detected {
            info!(change = relative_change, "Quality drift cleared");
        }

        state.drift_detected = drift;
        state.last_drift_check = Some(Instant::now());
        state.last_drift_report = Some(DriftReport {
            recent_mean,
            previous_mean,
            relative_change,
            drift_detected: drift,
            samples,
            checked_at: Utc::now(),
        });
    }
}

impl Default for AdaptiveQualityManager {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl std::fmt::Debug for AdaptiveQualityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveQualityManager")
            .field("drift_detected", &self.drift_detected())
            .finish_non_exhaustive()
    }
}

/// Read a rating in [0, 1] out of free-form feedback, if there is one.
///
/// Numbers in [0, 1] are taken as-is, (1, 5] as a five-star scale and
/// (5, 10] as a ten-point scale. Objects are searched for `rating` or
/// `score`.
pub fn feedback_rating(feedback: &serde_json::Value) -> Option<f64> {
    use serde_json::Value;
    match feedback {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => {
            let v = n.as_f64()?;
            if (0.0..=1.0).contains(&v) {
                Some(v)
            } else if v > 1.0 && v <= 5.0 {
                Some((v - 1.0) / 4.0)
            } else if v > 5.0 && v <= 10.0 {
                Some(v / 10.0)
            } else {
                None
            }
        }
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "positive" | "good" | "helpful" | "thumbs_up" | "up" | "yes" => Some(1.0),
            "negative" | "bad" | "unhelpful" | "thumbs_down" | "down" | "no" => Some(0.0),
            "neutral" => Some(0.5),
            _ => None,
        },
        Value::Object(map) => map
            .get("rating")
            .or_else(|| map.get("score"))
            .and_then(feedback_rating),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> AdaptiveQualityManager {
        AdaptiveQualityManager::default()
    }

    fn uniform(score: f64) -> QualityMetrics {
        QualityMetrics::new(score, score, score, score, score)
    }

    #[test]
    fn high_scores_pass_the_gate() {
        let a = manager().observe_metrics(uniform(0.9));
        assert!(a.meets_thresholds);
        assert!(a.failed_thresholds.is_empty());
    }

    #[test]
    fn low_scores_fail_every_threshold() {
        let a = manager().observe_metrics(uniform(0.2));
        assert!(!a.meets_thresholds);
        assert_eq!(a.failed_thresholds.len(), 6);
        assert_eq!(a.failed_thresholds[0], "format");
    }

    #[test]
    fn gate_uses_pre_update_thresholds() {
        let m = manager();
        for _ in 0..19 {
            m.observe_metrics(uniform(0.9));
        }
        // exactly at the initial semantic threshold
        let a = m.observe_metrics(QualityMetrics::new(0.9, 0.5, 0.9, 0.9, 0.9));
        assert!(a.meets_thresholds);
        let semantic = &m.get_threshold_status()[1];
        assert!(semantic.current_value > 0.5);
    }

    #[test]
    fn empty_response_is_scored_not_rejected() {
        let a = manager().evaluate_quality("How do I install Redis?", "", None);
        assert!((a.overall_score - 0.5).abs() < 1e-12);
        assert!(!a.meets_thresholds);
        assert!(a.failed_thresholds.contains(&"overall".to_string()));
    }

    #[test]
    fn drift_after_high_then_low() {
        let m = manager();
        for _ in 0..25 {
            m.observe_metrics(uniform(0.9));
        }
        assert!(!m.drift_detected());
        for _ in 0..25 {
            m.observe_metrics(uniform(0.3));
        }
        assert!(m.drift_detected());
        let report = m.last_drift_report().unwrap();
        assert_eq!(report.samples, 50);
        assert!(report.relative_change > 0.15);
    }

    #[test]
    fn drift_checks_respect_cadence() {
        let m = manager();
        for _ in 0..50 {
            m.observe_metrics(uniform(0.8));
        }
        assert!(!m.drift_detected());
        for _ in 0..30 {
            m.observe_metrics(uniform(0.2));
        }
        // next scheduled check is minutes away
        assert!(!m.drift_detected());
        assert_eq!(m.last_drift_report().unwrap().samples, 50);
        let forced = m.check_drift_now().unwrap();
        assert!(forced.drift_detected);
        assert!(m.drift_detected());
    }

    #[test]
    fn zero_interval_checks_every_time() {
        let config = PipelineConfig::from_toml_str("[quality]\ndrift_check_interval_secs = 0\n").unwrap();
        let m = AdaptiveQualityManager::from_config(&config);
        for _ in 0..50 {
            m.observe_metrics(uniform(0.8));
        }
        for _ in 0..25 {
            m.observe_metrics(uniform(0.2));
        }
        assert!(m.drift_detected());
        assert_eq!(m.last_drift_report().unwrap().samples, 75);
    }

    #[test]
    fn check_drift_needs_samples() {
        assert!(manager().check_drift_now().is_none());
    }

    #[test]
    fn introspection_does_not_mutate() {
        let m = manager();
        m.observe_metrics(uniform(0.7));
        let before = m.get_threshold_status();
        let _ = m.get_recent_performance(10);
        let _ = m.feedback_calibration();
        assert_eq!(before, m.get_threshold_status());
        assert_eq!(m.get_recent_performance(10).len(), 1);
    }

    #[test]
    fn recent_performance_is_latest_first_n() {
        let m = manager();
        for i in 0..5 {
            m.observe_metrics(uniform(i as f64 / 10.0));
        }
        let recent = m.get_recent_performance(2);
        assert_eq!(recent.len(), 2);
        assert!((recent[1].overall_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn performance_history_is_bounded() {
        let m = manager();
        for _ in 0..1100 {
            m.observe_metrics(uniform(0.7));
        }
        assert_eq!(m.get_recent_performance(usize::MAX).len(), 1000);
    }

    #[test]
    fn any_feedback_is_stored() {
        let m = manager();
        m.record_feedback("a", json!(5), uniform(0.9));
        m.record_feedback("b", json!({"rating": "negative"}), uniform(0.6));
        m.record_feedback("c", json!(["weird", null]), uniform(0.5));
        m.record_feedback("d", serde_json::Value::Null, uniform(0.5));
        let log = m.feedback_log();
        assert_eq!(log.len(), 4);
        assert_eq!(log[2].feedback, json!(["weird", null]));

        let calibration = m.feedback_calibration();
        assert_eq!(calibration.records, 4);
        assert_eq!(calibration.rated, 2);
        // |0.9 - 1.0| and |0.6 - 0.0|
        assert!((calibration.mean_absolute_error.unwrap() - 0.35).abs() < 1e-9);
    }

    #[test]
    fn feedback_log_is_bounded() {
        let m = manager();
        for i in 0..1005 {
            m.record_feedback(format!("i{i}"), json!(true), uniform(0.5));
        }
        let log = m.feedback_log();
        assert_eq!(log.len(), 1000);
        assert_eq!(log[0].interaction_id, "i5");
    }

    #[test]
    fn ratings_from_feedback() {
        assert_eq!(feedback_rating(&json!(0.25)), Some(0.25));
        assert_eq!(feedback_rating(&json!(3)), Some(0.5));
        assert_eq!(feedback_rating(&json!(8)), Some(0.8));
        assert_eq!(feedback_rating(&json!(-2)), None);
        assert_eq!(feedback_rating(&json!("Positive")), Some(1.0));
        assert_eq!(feedback_rating(&json!({"score": false})), Some(0.0));
        assert_eq!(feedback_rating(&json!("meh")), None);
    }

    #[tokio::test]
    async fn async_matches_sync_scoring() {
        let m = manager();
        let sync = m.evaluate_quality("How do I configure nginx?", "Open nginx.conf and add a server block.", None);
        let async_result = m
            .evaluate_quality_async("How do I configure nginx?", "Open nginx.conf and add a server block.", None)
            .await;
        assert_eq!(sync.overall_score, async_result.overall_score);
        assert_eq!(m.get_recent_performance(10).len(), 2);
    }

    #[tokio::test]
    async fn concurrent_evaluations_all_recorded() {
        let m = manager();
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let m = m.clone();
                tokio::spawn(async move { m.evaluate_quality_async(format!("query {i}"), "a response", None).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(m.get_recent_performance(100).len(), 16);
        assert_eq!(m.get_threshold_status()[0].samples, 16);
    }
}
