//! Caller-owned provenance record.
//!
//! The engine only appends: one [`ContextEntry`] per retrieval attempt and one
//! [`Reference`] per newly seen candidate id. Existing references are consulted
//! solely to skip ids that were already reported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RankedCandidate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Retrieve,
    HybridRetrieve,
    IterativeStep,
    VectorQuery,
    KeywordScan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    Found { count: usize },
    Empty,
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub id: String,
    pub title: String,
    pub source: String,
    pub distance: f32,
}

impl Reference {
    /// `title`/`source` come from metadata when present, falling back to the
    /// parent id and `"vector-store"`.
    pub fn from_candidate(c: &RankedCandidate) -> Self {
        let title = c.metadata.get("title").and_then(|v| v.as_str())
            .or_else(|| c.metadata.get("parentId").and_then(|v| v.as_str()))
            .unwrap_or(&c.id)
            .to_string();
        let source = c.metadata.get("source").and_then(|v| v.as_str()).unwrap_or("vector-store").to_string();
        Self { id: c.id.clone(), title, source, distance: c.distance }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalContext {
    pub entries: Vec<ContextEntry>,
    pub references: Vec<Reference>,
}

impl RetrievalContext {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, kind: EntryKind, query: &str, status: EntryStatus) {
        self.entries.push(ContextEntry { kind, query: query.to_string(), timestamp: Utc::now(), status });
    }

    /// Append references for candidates not reported yet; returns how many were added.
    pub fn add_references(&mut self, candidates: &[RankedCandidate]) -> usize {
        let mut added = 0;
        for c in candidates {
            if self.references.iter().any(|r| r.id == c.id) { continue; }
            self.references.push(Reference::from_candidate(c));
            added += 1;
        }
        added
    }

    pub fn failures(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.iter().filter(|e| matches!(e.status, EntryStatus::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metadata, MetaValue};

    fn cand(id: &str, title: Option<&str>) -> RankedCandidate {
        let mut metadata = Metadata::new();
        if let Some(t) = title { metadata.insert("title".into(), MetaValue::from(t)); }
        RankedCandidate { id: id.into(), content: String::new(), metadata, distance: 0.25, rrf: 1.0, transformer_score: 0.0, vector_rank: Some(1), keyword_rank: None }
    }

    #[test]
    fn references_are_deduplicated_by_id() {
        let mut ctx = RetrievalContext::new();
        assert_eq!(ctx.add_references(&[cand("a", Some("A")), cand("b", None)]), 2);
        assert_eq!(ctx.add_references(&[cand("a", Some("A")), cand("c", None)]), 1);
        let ids: Vec<_> = ctx.references.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(ctx.references[0].title, "A");
        assert_eq!(ctx.references[1].title, "b");
        assert_eq!(ctx.references[1].source, "vector-store");
    }

    #[test]
    fn entries_serialize_with_type_and_status() {
        let mut ctx = RetrievalContext::new();
        ctx.record(EntryKind::HybridRetrieve, "q", EntryStatus::Found { count: 2 });
        let v = serde_json::to_value(&ctx.entries[0]).unwrap();
        assert_eq!(v["type"], "hybrid_retrieve");
        assert_eq!(v["status"], "found");
        assert_eq!(v["count"], 2);
    }
}
