//! Memory retrieval → planning.

use baton_context::MemoryOptimizationResult;
use baton_core::MemoryCandidate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::{preview, ContextSize, Metadata};

/// Everything the memory stage produced for one turn.
///
/// `memories` holds the full retrieved snippets; the optimizer's bounded
/// selection, when present, sits alongside in `optimization`.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryContext {
    pub query: String,
    pub memories: Vec<MemoryCandidate>,
    pub optimization: Option<MemoryOptimizationResult>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl MemoryContext {
    pub fn new(query: impl Into<String>, memories: Vec<MemoryCandidate>) -> Self {
        Self {
            query: query.into(),
            memories,
            optimization: None,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_optimization(mut self, optimization: MemoryOptimizationResult) -> Self {
        self.optimization = Some(optimization);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Characters across all retrieved memories.
    pub fn total_chars(&self) -> usize {
        self.memories.iter().map(MemoryCandidate::len).sum()
    }

    /// Every memory in full, numbered, with its store score.
    pub fn get_full_memory_context(&self) -> String {
        let mut out = format!("Query: {}\n", self.query);
        for (i, memory) in self.memories.iter().enumerate() {
            out.push_str(&format!("\n[{}] (score {:.3})", i + 1, memory.score));
            if let Some(source) = &memory.source {
                out.push_str(&format!(" [{source}]"));
            }
            out.push('\n');
            out.push_str(&memory.content);
            out.push('\n');
        }
        out
    }

    pub fn get_structured_memory_context(&self) -> serde_json::Value {
        let memories: Vec<serde_json::Value> = self
            .memories
            .iter()
            .enumerate()
            .map(|(index, m)| {
                json!({
                    "index": index,
                    "id": m.id,
                    "source": m.source,
                    "score": m.score,
                    "content": m.content,
                    "length": m.len(),
                })
            })
            .collect();
        json!({
            "query": self.query,
            "memory_count": self.memories.len(),
            "total_chars": self.total_chars(),
            "memories": memories,
            "optimization": self.optimization,
            "metadata": self.metadata,
            "created_at": self.created_at,
        })
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "MemoryContext: {} memories ({} chars) for \"{}\"",
            self.memories.len(),
            self.total_chars(),
            preview(&self.query)
        );
        if let Some(opt) = &self.optimization {
            summary.push_str(&format!(
                "; selected {} ({} chars, {} compressed, complexity {:.2})",
                opt.memories.len(),
                opt.total_length,
                opt.compressed_count,
                opt.query_complexity
            ));
        }
        summary
    }
}

impl ContextSize for MemoryContext {
    fn content_size(&self) -> usize {
        self.total_chars()
    }
}
