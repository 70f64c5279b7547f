//! Memory candidates handed to the pipeline by the external vector store.
//!
//! Retrieval itself is out of scope: the store ranks snippets and hands this
//! layer an ordered list of `{content, score}` pairs.

use serde::{Deserialize, Serialize};

/// A single retrieved memory snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCandidate {
    /// Optional store-side identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The full memory text.
    pub content: String,

    /// Similarity or importance score reported by the store (nominally 0.0–1.0).
    #[serde(default, alias = "similarity", alias = "importance")]
    pub score: f64,

    /// Source label (conversation id, document, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MemoryCandidate {
    pub fn new(content: impl Into<String>, score: f64) -> Self {
        Self {
            id: None,
            content: content.into(),
            score,
            source: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The store score clamped into [0, 1]; NaN maps to 0.
    pub fn normalized_score(&self) -> f64 {
        if self.score.is_nan() {
            0.0
        } else {
            self.score.clamp(0.0, 1.0)
        }
    }

    /// Content length in characters.
    pub fn len(&self) -> usize {
        crate::text::char_len(&self.content)
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
