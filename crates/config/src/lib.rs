//! Configuration loading, validation, and management for Baton.
//!
//! Loads configuration from `$BATON_CONFIG` or `~/.baton/config.toml` with
//! environment variable overrides. Every field has a default, so a missing
//! file or a partial file is always valid input.
//!
//! The numeric weights below are empirically chosen defaults. Only their
//! rough proportions matter; they are exposed so deployments can tune them.

pub mod vocabulary;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use vocabulary::{KeywordConfig, VocabularyConfig};

/// The root configuration structure.
///
/// Maps directly to `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Extractor vocabularies
    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    /// Keyword classes shared by the scorers
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Smart context compressor
    #[serde(default)]
    pub compressor: CompressorConfig,

    /// Handoff optimizer (memory context selection)
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Debate activation engine
    #[serde(default)]
    pub debate: DebateConfig,

    /// Adaptive quality manager
    #[serde(default)]
    pub quality: QualityConfig,

    /// Cross-agent learning and coordination
    #[serde(default)]
    pub learning: LearningConfig,
}

// ── Compressor ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressorConfig {
    /// Target used when the caller passes a zero target length.
    #[serde(default = "default_target_length")]
    pub default_target_length: usize,

    /// Score per entity found in a sentence.
    #[serde(default = "default_entity_weight")]
    pub entity_weight: f64,

    /// Score per concept found in a sentence.
    #[serde(default = "default_concept_weight")]
    pub concept_weight: f64,

    /// Bonus for the first sentence, decaying linearly over `leading_sentences`.
    #[serde(default = "default_position_bonus")]
    pub position_bonus: f64,

    #[serde(default = "default_leading_sentences")]
    pub leading_sentences: usize,

    /// Documented upper bound on output length relative to the target.
    #[serde(default = "default_tolerance_factor")]
    pub tolerance_factor: f64,

    /// Head truncation backs off to a word boundary found within this
    /// trailing fraction of the cut.
    #[serde(default = "default_word_boundary_window")]
    pub word_boundary_window: f64,
}

fn default_target_length() -> usize {
    500
}
fn default_entity_weight() -> f64 {
    2.0
}
fn default_concept_weight() -> f64 {
    1.5
}
fn default_position_bonus() -> f64 {
    1.0
}
fn default_leading_sentences() -> usize {
    3
}
fn default_tolerance_factor() -> f64 {
    1.1
}
fn default_word_boundary_window() -> f64 {
    0.2
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            default_target_length: default_target_length(),
            entity_weight: default_entity_weight(),
            concept_weight: default_concept_weight(),
            position_bonus: default_position_bonus(),
            leading_sentences: default_leading_sentences(),
            tolerance_factor: default_tolerance_factor(),
            word_boundary_window: default_word_boundary_window(),
        }
    }
}

// ── Optimizer ─────────────────────────────────────────────────────────────

/// Weights of the query-complexity estimate.
///
/// Comparison + decision together outweigh every other signal combined, so
/// a query carrying both always scores above one carrying neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryComplexityWeights {
    pub length: f64,
    pub comparison: f64,
    pub decision: f64,
    pub analysis: f64,
    pub question: f64,
}

impl Default for QueryComplexityWeights {
    fn default() -> Self {
        Self {
            length: 0.25,
            comparison: 0.30,
            decision: 0.30,
            analysis: 0.10,
            question: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Budget used when the caller passes a zero `max_length`.
    #[serde(default = "default_max_length")]
    pub default_max_length: usize,

    /// Floor of the complexity estimate (degenerate queries land here).
    #[serde(default = "default_min_complexity")]
    pub min_complexity: f64,

    /// Word count at which the length signal saturates.
    #[serde(default = "default_query_length_norm")]
    pub length_norm: f64,

    /// Share of `max_length` granted to the simplest query; the rest scales
    /// with complexity.
    #[serde(default = "default_min_budget_ratio")]
    pub min_budget_ratio: f64,

    /// Weight of the upstream similarity score in the blended rank.
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f64,

    /// Weight of query-term overlap in the blended rank.
    #[serde(default = "default_overlap_weight")]
    pub overlap_weight: f64,

    /// Smallest remaining budget worth compressing a memory into.
    #[serde(default = "default_min_compressed_length")]
    pub min_compressed_length: usize,

    #[serde(default)]
    pub complexity_weights: QueryComplexityWeights,
}

fn default_max_length() -> usize {
    4000
}
fn default_min_complexity() -> f64 {
    0.1
}
fn default_query_length_norm() -> f64 {
    30.0
}
fn default_min_budget_ratio() -> f64 {
    0.6
}
fn default_similarity_weight() -> f64 {
    0.6
}
fn default_overlap_weight() -> f64 {
    0.4
}
fn default_min_compressed_length() -> usize {
    80
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            default_max_length: default_max_length(),
            min_complexity: default_min_complexity(),
            length_norm: default_query_length_norm(),
            min_budget_ratio: default_min_budget_ratio(),
            similarity_weight: default_similarity_weight(),
            overlap_weight: default_overlap_weight(),
            min_compressed_length: default_min_compressed_length(),
            complexity_weights: QueryComplexityWeights::default(),
        }
    }
}

// ── Debate ────────────────────────────────────────────────────────────────

/// Weights of the debate engine's complexity estimate (capped at 1.0).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateComplexityWeights {
    pub length: f64,
    pub comparison: f64,
    pub decision: f64,
    pub analysis: f64,
    pub reasoning: f64,
    pub debate_pattern: f64,
    pub question: f64,
}

impl Default for DebateComplexityWeights {
    fn default() -> Self {
        Self {
            length: 0.20,
            comparison: 0.25,
            decision: 0.25,
            analysis: 0.10,
            reasoning: 0.10,
            debate_pattern: 0.05,
            question: 0.04,
        }
    }
}

/// Weights of debate worthiness (capped at 1.0).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorthinessWeights {
    pub comparison: f64,
    pub decision: f64,
    pub analysis: f64,
    pub reasoning: f64,
    pub debate_pattern: f64,
    pub question: f64,
    pub length_bonus: f64,
}

impl Default for WorthinessWeights {
    fn default() -> Self {
        Self {
            comparison: 0.35,
            decision: 0.30,
            analysis: 0.15,
            reasoning: 0.15,
            debate_pattern: 0.10,
            question: 0.10,
            length_bonus: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Worthiness at or above which a debate is activated.
    #[serde(default = "default_activation_threshold")]
    pub activation_threshold: f64,

    /// Complexity above which comparison queries go to a judge protocol.
    #[serde(default = "default_judge_complexity")]
    pub judge_complexity_threshold: f64,

    /// Word count that earns the length bonus.
    #[serde(default = "default_long_query_words")]
    pub long_query_words: usize,

    /// Word count at which the complexity length signal saturates.
    #[serde(default = "default_debate_length_norm")]
    pub length_norm: f64,

    /// Worthiness added when upstream evidence conflicts.
    #[serde(default = "default_conflict_bonus")]
    pub conflict_bonus: f64,

    #[serde(default)]
    pub complexity_weights: DebateComplexityWeights,

    #[serde(default)]
    pub worthiness_weights: WorthinessWeights,
}

fn default_activation_threshold() -> f64 {
    0.5
}
fn default_judge_complexity() -> f64 {
    0.7
}
fn default_long_query_words() -> usize {
    15
}
fn default_debate_length_norm() -> f64 {
    50.0
}
fn default_conflict_bonus() -> f64 {
    0.1
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            activation_threshold: default_activation_threshold(),
            judge_complexity_threshold: default_judge_complexity(),
            long_query_words: default_long_query_words(),
            length_norm: default_debate_length_norm(),
            conflict_bonus: default_conflict_bonus(),
            complexity_weights: DebateComplexityWeights::default(),
            worthiness_weights: WorthinessWeights::default(),
        }
    }
}

// ── Quality ───────────────────────────────────────────────────────────────

/// Initial value and hard bounds of one adaptive threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdBounds {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
}

impl ThresholdBounds {
    pub const fn new(initial: f64, min: f64, max: f64) -> Self {
        Self { initial, min, max }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSet {
    pub format: ThresholdBounds,
    pub semantic: ThresholdBounds,
    pub relevance: ThresholdBounds,
    pub tone: ThresholdBounds,
    pub solution: ThresholdBounds,
    pub overall: ThresholdBounds,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            format: ThresholdBounds::new(0.5, 0.3, 0.9),
            semantic: ThresholdBounds::new(0.5, 0.3, 0.9),
            relevance: ThresholdBounds::new(0.5, 0.3, 0.9),
            tone: ThresholdBounds::new(0.5, 0.3, 0.9),
            solution: ThresholdBounds::new(0.5, 0.3, 0.9),
            overall: ThresholdBounds::new(0.55, 0.35, 0.9),
        }
    }
}

impl ThresholdSet {
    /// `(name, bounds)` pairs in evaluation order.
    pub fn entries(&self) -> [(&'static str, ThresholdBounds); 6] {
        [
            ("format", self.format),
            ("semantic", self.semantic),
            ("relevance", self.relevance),
            ("tone", self.tone),
            ("solution", self.solution),
            ("overall", self.overall),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Fraction of the gap to the target closed per update.
    #[serde(default = "default_adjustment_rate")]
    pub adjustment_rate: f64,

    /// Observations kept per threshold.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Observations required before a threshold starts adapting.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Target = mean - `stdev_factor` * stdev.
    #[serde(default = "default_stdev_factor")]
    pub stdev_factor: f64,

    /// Performance samples required before drift is checked.
    #[serde(default = "default_drift_min_samples")]
    pub drift_min_samples: usize,

    /// Size of each of the two compared windows.
    #[serde(default = "default_drift_window")]
    pub drift_window: usize,

    /// Relative change of the window means that counts as drift.
    #[serde(default = "default_drift_relative_threshold")]
    pub drift_relative_threshold: f64,

    /// Minimum wall-clock spacing between drift checks.
    #[serde(default = "default_drift_check_interval_secs")]
    pub drift_check_interval_secs: u64,

    #[serde(default = "default_performance_history_size")]
    pub performance_history_size: usize,

    #[serde(default = "default_feedback_log_size")]
    pub feedback_log_size: usize,

    #[serde(default)]
    pub thresholds: ThresholdSet,
}

fn default_adjustment_rate() -> f64 {
    0.05
}
fn default_history_size() -> usize {
    100
}
fn default_min_samples() -> usize {
    20
}
fn default_stdev_factor() -> f64 {
    0.5
}
fn default_drift_min_samples() -> usize {
    50
}
fn default_drift_window() -> usize {
    25
}
fn default_drift_relative_threshold() -> f64 {
    0.15
}
fn default_drift_check_interval_secs() -> u64 {
    300
}
fn default_performance_history_size() -> usize {
    1000
}
fn default_feedback_log_size() -> usize {
    1000
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            adjustment_rate: default_adjustment_rate(),
            history_size: default_history_size(),
            min_samples: default_min_samples(),
            stdev_factor: default_stdev_factor(),
            drift_min_samples: default_drift_min_samples(),
            drift_window: default_drift_window(),
            drift_relative_threshold: default_drift_relative_threshold(),
            drift_check_interval_secs: default_drift_check_interval_secs(),
            performance_history_size: default_performance_history_size(),
            feedback_log_size: default_feedback_log_size(),
            thresholds: ThresholdSet::default(),
        }
    }
}

// ── Learning ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Mean latency above which an agent is a bottleneck.
    #[serde(default = "default_latency_ceiling_ms")]
    pub latency_ceiling_ms: f64,

    /// Mean quality below which an agent is a bottleneck.
    #[serde(default = "default_quality_floor")]
    pub quality_floor: f64,

    /// Mean error rate above which an agent is a bottleneck.
    #[serde(default = "default_error_rate_ceiling")]
    pub error_rate_ceiling: f64,

    /// Quality required before a pattern is shared with other agents.
    #[serde(default = "default_share_quality_floor")]
    pub share_quality_floor: f64,
}

fn default_latency_ceiling_ms() -> f64 {
    5000.0
}
fn default_quality_floor() -> f64 {
    0.6
}
fn default_error_rate_ceiling() -> f64 {
    0.1
}
fn default_share_quality_floor() -> f64 {
    0.8
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            latency_ceiling_ms: default_latency_ceiling_ms(),
            quality_floor: default_quality_floor(),
            error_rate_ceiling: default_error_rate_ceiling(),
            share_quality_floor: default_share_quality_floor(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Load configuration from the default location.
    ///
    /// Priority:
    /// 1. `$BATON_CONFIG` if set
    /// 2. `~/.baton/config.toml`
    /// 3. Built-in defaults
    ///
    /// Environment variables override individual settings afterwards.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("BATON_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));

        let mut config = Self::load_from(&path)?;

        if let Ok(value) = std::env::var("BATON_ACTIVATION_THRESHOLD") {
            config.debate.activation_threshold =
                value.parse().map_err(|_| ConfigError::ValidationError(format!(
                    "BATON_ACTIVATION_THRESHOLD is not a number: {value}"
                )))?;
        }

        if let Ok(value) = std::env::var("BATON_DRIFT_CHECK_INTERVAL_SECS") {
            config.quality.drift_check_interval_secs =
                value.parse().map_err(|_| ConfigError::ValidationError(format!(
                    "BATON_DRIFT_CHECK_INTERVAL_SECS is not an integer: {value}"
                )))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".baton")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.quality;
        if !(q.adjustment_rate > 0.0 && q.adjustment_rate <= 1.0) {
            return Err(ConfigError::ValidationError(
                "quality.adjustment_rate must be in (0, 1]".into(),
            ));
        }
        if q.history_size < q.min_samples || q.min_samples == 0 {
            return Err(ConfigError::ValidationError(
                "quality.min_samples must be > 0 and <= quality.history_size".into(),
            ));
        }
        if q.drift_window == 0 || q.drift_min_samples < 2 * q.drift_window {
            return Err(ConfigError::ValidationError(
                "quality.drift_min_samples must cover two non-empty drift windows".into(),
            ));
        }
        if q.performance_history_size < q.drift_min_samples {
            return Err(ConfigError::ValidationError(
                "quality.performance_history_size must be >= quality.drift_min_samples".into(),
            ));
        }
        for (name, b) in q.thresholds.entries() {
            let ordered = 0.0 <= b.min && b.min <= b.initial && b.initial <= b.max && b.max <= 1.0;
            if !ordered {
                return Err(ConfigError::ValidationError(format!(
                    "threshold '{name}' must satisfy 0 <= min <= initial <= max <= 1"
                )));
            }
        }

        let d = &self.debate;
        if !(0.0..=1.0).contains(&d.activation_threshold) {
            return Err(ConfigError::ValidationError(
                "debate.activation_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if d.length_norm <= 0.0 || self.optimizer.length_norm <= 0.0 {
            return Err(ConfigError::ValidationError("length_norm must be > 0".into()));
        }

        let o = &self.optimizer;
        if o.similarity_weight < 0.0
            || o.overlap_weight < 0.0
            || o.similarity_weight + o.overlap_weight <= 0.0
        {
            return Err(ConfigError::ValidationError(
                "optimizer.similarity_weight + overlap_weight must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&o.min_budget_ratio) {
            return Err(ConfigError::ValidationError(
                "optimizer.min_budget_ratio must be between 0.0 and 1.0".into(),
            ));
        }
        if o.default_max_length == 0 || self.compressor.default_target_length == 0 {
            return Err(ConfigError::ValidationError(
                "default lengths must be > 0".into(),
            ));
        }

        if self.compressor.tolerance_factor < 1.0 {
            return Err(ConfigError::ValidationError(
                "compressor.tolerance_factor must be >= 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for baton_core::Error {
    fn from(err: ConfigError) -> Self {
        baton_core::Error::Config {
            message: err.to_string(),
        }
    }
}
