//! Shared knowledge base.
//!
//! An explicitly constructed store of patterns and findings shared between
//! agents. Callers hold it in an `Arc` and pass it to whatever needs it.
//! Items are never deleted within a session; usage outcomes update their
//! success rate.

use std::collections::HashMap;
use std::sync::RwLock;

use baton_core::keywords::TextProbe;
use baton_core::text::significant_terms;
use baton_core::{sync, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Structured knowledge content.
pub type KnowledgeContent = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub source_agent: String,
    pub knowledge_type: String,
    pub content: KnowledgeContent,
    /// In [0, 1].
    pub confidence: f64,
    pub usage_count: u64,
    pub success_count: u64,
    /// `success_count / usage_count`, 0.0 before first use.
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl KnowledgeItem {
    /// All string content flattened, for term matching.
    fn searchable_text(&self) -> String {
        let mut text = self.knowledge_type.replace('_', " ");
        for (key, value) in &self.content {
            text.push(' ');
            text.push_str(&key.replace('_', " "));
            push_strings(value, &mut text);
        }
        text
    }
}

fn push_strings(value: &serde_json::Value, out: &mut String) {
    use serde_json::Value;
    match value {
        Value::String(s) => {
            out.push(' ');
            out.push_str(s);
        }
        Value::Array(items) => items.iter().for_each(|v| push_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| push_strings(v, out)),
        _ => {}
    }
}

#[derive(Debug, Default)]
pub struct KnowledgeBase {
    items: RwLock<HashMap<String, KnowledgeItem>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new item and return its generated id.
    pub fn share_knowledge(
        &self,
        source_agent: impl Into<String>,
        knowledge_type: impl Into<String>,
        content: KnowledgeContent,
        confidence: f64,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let item = KnowledgeItem {
            id: id.clone(),
            source_agent: source_agent.into(),
            knowledge_type: knowledge_type.into(),
            content,
            confidence: if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) },
            usage_count: 0,
            success_count: 0,
            success_rate: 0.0,
            created_at: Utc::now(),
            last_used_at: None,
        };
        debug!(
            id = %id,
            agent = %item.source_agent,
            kind = %item.knowledge_type,
            confidence = item.confidence,
            "Knowledge shared"
        );
        sync::write(&self.items, "knowledge base").insert(id.clone(), item);
        id
    }

    /// Items matching the optional filters, highest confidence first.
    pub fn query_knowledge(&self, knowledge_type: Option<&str>, min_confidence: Option<f64>) -> Vec<KnowledgeItem> {
        let items = sync::read(&self.items, "knowledge base");
        let mut matches: Vec<KnowledgeItem> = items
            .values()
            .filter(|item| knowledge_type.is_none_or(|t| item.knowledge_type == t))
            .filter(|item| min_confidence.is_none_or(|min| item.confidence >= min))
            .cloned()
            .collect();
        drop(items);
        matches.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        matches
    }

    /// Count one use of an item. Returns false for an unknown id.
    pub fn record_knowledge_usage(&self, id: &str, success: bool) -> bool {
        let mut items = sync::write(&self.items, "knowledge base");
        let Some(item) = items.get_mut(id) else {
            debug!(id, "Usage recorded for unknown knowledge item");
            return false;
        };
        item.usage_count += 1;
        if success {
            item.success_count += 1;
        }
        item.success_rate = item.success_count as f64 / item.usage_count as f64;
        item.last_used_at = Some(Utc::now());
        true
    }

    pub fn get(&self, id: &str) -> Option<KnowledgeItem> {
        sync::read(&self.items, "knowledge base").get(id).cloned()
    }

    pub fn len(&self) -> usize {
        sync::read(&self.items, "knowledge base").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items ranked by query-term overlap × confidence × (0.5 + 0.5·success
    /// rate). Items with no overlap are left out.
    pub fn find_relevant(&self, query: &str, limit: usize) -> Vec<KnowledgeItem> {
        let terms = significant_terms(query);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }
        let items = sync::read(&self.items, "knowledge base");
        let mut scored: Vec<(f64, &KnowledgeItem)> = items
            .values()
            .filter_map(|item| {
                let probe = TextProbe::new(&item.searchable_text());
                let hits = terms.iter().filter(|t| probe.contains_token(t)).count();
                if hits == 0 {
                    return None;
                }
                let overlap = hits as f64 / terms.len() as f64;
                Some((overlap * item.confidence * (0.5 + 0.5 * item.success_rate), item))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored.into_iter().take(limit).map(|(_, item)| item.clone()).collect()
    }

    /// Serialize every item for an external persistence layer.
    pub fn snapshot(&self) -> Result<String> {
        let items = sync::read(&self.items, "knowledge base");
        let mut list: Vec<&KnowledgeItem> = items.values().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(serde_json::to_string(&list)?)
    }

    /// Restore from [`snapshot`](Self::snapshot) output.
    pub fn try_from_snapshot(json: &str) -> Result<Self> {
        let list: Vec<KnowledgeItem> =
            serde_json::from_str(json).map_err(|e| Error::KnowledgeStore(e.to_string()))?;
        let items = list.into_iter().map(|item| (item.id.clone(), item)).collect();
        Ok(Self {
            items: RwLock::new(items),
        })
    }

    /// Like [`try_from_snapshot`](Self::try_from_snapshot), but a corrupt
    /// snapshot yields an empty base.
    pub fn from_snapshot(json: &str) -> Self {
        Self::try_from_snapshot(json).unwrap_or_else(|e| {
            warn!(error = %e, "Knowledge snapshot unreadable, starting empty");
            Self::new()
        })
    }
}
