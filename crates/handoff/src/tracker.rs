//! Preservation tracking across handoffs.
//!
//! Purely observational: every crossing appends a record, and statistics
//! are computed on demand.

use std::collections::BTreeMap;
use std::sync::RwLock;

use baton_core::sync;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::{ContextSize, HandoffType, Metadata};

/// One boundary crossing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffRecord {
    pub handoff_type: HandoffType,
    pub input_size: usize,
    pub output_size: usize,
    /// `output_size / input_size`; 1.0 for an empty input.
    pub preservation_ratio: f64,
    pub metadata: Metadata,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate preservation ratios for a group of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreservationStats {
    pub count: usize,
    pub mean_ratio: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl PreservationStats {
    fn from_ratios(ratios: &[f64]) -> Option<Self> {
        let mean_ratio = baton_core::text::mean(ratios)?;
        Some(Self {
            count: ratios.len(),
            mean_ratio,
            min_ratio: ratios.iter().copied().fold(f64::INFINITY, f64::min),
            max_ratio: ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Statistics per handoff type plus overall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreservationReport {
    /// `None` before the first record.
    pub overall: Option<PreservationStats>,
    pub by_type: BTreeMap<String, PreservationStats>,
}

/// Append-only handoff log.
#[derive(Debug, Default)]
pub struct HandoffPreservationTracker {
    records: RwLock<Vec<HandoffRecord>>,
}

impl HandoffPreservationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a crossing and return its preservation ratio.
    pub fn record_handoff(
        &self,
        handoff_type: HandoffType,
        input_size: usize,
        output_size: usize,
        metadata: Metadata,
    ) -> f64 {
        let preservation_ratio = if input_size == 0 {
            1.0
        } else {
            output_size as f64 / input_size as f64
        };
        debug!(
            handoff = %handoff_type,
            input_size,
            output_size,
            ratio = preservation_ratio,
            "Handoff recorded"
        );
        let record = HandoffRecord {
            handoff_type,
            input_size,
            output_size,
            preservation_ratio,
            metadata,
            recorded_at: Utc::now(),
        };
        sync::write(&self.records, "handoff records").push(record);
        preservation_ratio
    }

    /// Record a crossing measured from the contexts themselves.
    pub fn track<I, O>(&self, handoff_type: HandoffType, input: &I, output: &O, metadata: Metadata) -> f64
    where
        I: ContextSize + ?Sized,
        O: ContextSize + ?Sized,
    {
        self.record_handoff(handoff_type, input.content_size(), output.content_size(), metadata)
    }

    pub fn len(&self) -> usize {
        sync::read(&self.records, "handoff records").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records, oldest first.
    pub fn records(&self) -> Vec<HandoffRecord> {
        sync::read(&self.records, "handoff records").clone()
    }

    pub fn get_preservation_stats(&self) -> PreservationReport {
        let records = sync::read(&self.records, "handoff records");
        let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records.iter() {
            grouped
                .entry(record.handoff_type.to_string())
                .or_default()
                .push(record.preservation_ratio);
        }
        let all: Vec<f64> = records.iter().map(|r| r.preservation_ratio).collect();
        drop(records);

        PreservationReport {
            overall: PreservationStats::from_ratios(&all),
            by_type: grouped
                .into_iter()
                .filter_map(|(name, ratios)| PreservationStats::from_ratios(&ratios).map(|s| (name, s)))
                .collect(),
        }
    }
}
