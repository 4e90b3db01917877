//! Domain types shared by the chunker, the store adapters and the fusion engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type DocId = String;
pub type Metadata = BTreeMap<String, MetaValue>;
/// Key → expected value; a candidate passes when every key matches exactly.
pub type MetadataFilter = BTreeMap<String, MetaValue>;

/// Placeholder distance for keyword-only hits, which have no native similarity.
pub const KEYWORD_DISTANCE: f32 = 0.5;

/// A scalar metadata value. Anything richer is flattened on write, see [`sanitize_metadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self { MetaValue::Text(s) => Some(s), _ => None }
    }

    /// Command-line style input: a JSON scalar (`3`, `true`, `null`, `"3"`)
    /// keeps its type, anything else is taken as plain text.
    pub fn parse_scalar(input: &str) -> Self {
        match serde_json::from_str::<Value>(input.trim()) {
            Ok(v @ (Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))) => Self::from_json(&v),
            _ => MetaValue::Text(input.to_string()),
        }
    }

    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => MetaValue::Null,
            Value::Bool(b) => MetaValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(MetaValue::Number).unwrap_or_else(|| MetaValue::Text(n.to_string())),
            Value::String(s) => MetaValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => MetaValue::Text(v.to_string()),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => f.write_str("null"),
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            MetaValue::Number(n) => write!(f, "{n}"),
            MetaValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue { fn from(s: &str) -> Self { MetaValue::Text(s.to_string()) } }
impl From<String> for MetaValue { fn from(s: String) -> Self { MetaValue::Text(s) } }
impl From<bool> for MetaValue { fn from(b: bool) -> Self { MetaValue::Bool(b) } }
impl From<f64> for MetaValue { fn from(n: f64) -> Self { MetaValue::Number(n) } }
impl From<i64> for MetaValue { fn from(n: i64) -> Self { MetaValue::Number(n as f64) } }
impl From<usize> for MetaValue { fn from(n: usize) -> Self { MetaValue::Number(n as f64) } }

/// Flatten caller-supplied JSON metadata into scalars.
///
/// Scalars pass through; arrays and objects become their JSON text.
pub fn sanitize_metadata(raw: &serde_json::Map<String, Value>) -> Metadata {
    raw.iter().map(|(k, v)| (k.clone(), MetaValue::from_json(v))).collect()
}

/// True when `metadata` carries every `filter` key with an equal value.
pub fn matches_filter(metadata: &Metadata, filter: &MetadataFilter) -> bool {
    filter.iter().all(|(k, expected)| metadata.get(k) == Some(expected))
}

/// A stored, retrievable unit. `id` is unique within a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: Metadata::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Caller-facing upsert payload; metadata may hold arbitrary JSON until sanitized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInput {
    pub id: DocId,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl DocumentInput {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: serde_json::Map::new() }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn sanitize(&self) -> Document {
        Document { id: self.id.clone(), content: self.content.clone(), metadata: sanitize_metadata(&self.metadata) }
    }
}

/// `<parent>::chunk<n>`, `n` starting at 1.
pub fn chunk_id(parent_id: &str, n: usize) -> String { format!("{parent_id}::chunk{n}") }

/// True if `id` was produced by [`chunk_id`] for `parent_id`.
pub fn is_chunk_of(id: &str, parent_id: &str) -> bool {
    id.strip_prefix(parent_id)
        .and_then(|rest| rest.strip_prefix("::chunk"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Which search produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Keyword,
}

/// A single hit from either search. Lower `distance` is more similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocId,
    pub content: String,
    pub metadata: Metadata,
    pub distance: f32,
    pub source: SourceKind,
}

impl SearchHit {
    pub fn from_document(doc: Document, distance: f32, source: SourceKind) -> Self {
        Self { id: doc.id, content: doc.content, metadata: doc.metadata, distance, source }
    }
}

/// A fused candidate carrying every score the pipeline computed for it.
///
/// - `distance`: vector distance, or [`KEYWORD_DISTANCE`] for keyword-only hits
/// - `rrf`: reciprocal-rank-fusion score, higher is better
/// - `transformer_score`: cosine(query, content) from re-ranking, higher is better
/// - `vector_rank`/`keyword_rank`: 1-based rank in each source list, if present
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub id: DocId,
    pub content: String,
    pub metadata: Metadata,
    pub distance: f32,
    pub rrf: f32,
    pub transformer_score: f32,
    pub vector_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_flattens_non_scalars() {
        let raw = json!({"title": "a", "n": 3, "ok": true, "none": null, "tags": ["x", "y"], "obj": {"k": 1}});
        let meta = sanitize_metadata(raw.as_object().unwrap());
        assert_eq!(meta["title"], MetaValue::Text("a".into()));
        assert_eq!(meta["n"], MetaValue::Number(3.0));
        assert_eq!(meta["ok"], MetaValue::Bool(true));
        assert_eq!(meta["none"], MetaValue::Null);
        assert_eq!(meta["tags"], MetaValue::Text("[\"x\",\"y\"]".into()));
        assert_eq!(meta["obj"], MetaValue::Text("{\"k\":1}".into()));
    }

    #[test]
    fn parse_scalar_keeps_json_types() {
        assert_eq!(MetaValue::parse_scalar("1"), MetaValue::Number(1.0));
        assert_eq!(MetaValue::parse_scalar("2.5"), MetaValue::Number(2.5));
        assert_eq!(MetaValue::parse_scalar("true"), MetaValue::Bool(true));
        assert_eq!(MetaValue::parse_scalar("null"), MetaValue::Null);
        assert_eq!(MetaValue::parse_scalar("\"1\""), MetaValue::Text("1".into()));
        assert_eq!(MetaValue::parse_scalar("guide"), MetaValue::Text("guide".into()));
        assert_eq!(MetaValue::parse_scalar("[1,2]"), MetaValue::Text("[1,2]".into()));
        let mut filter = MetadataFilter::new();
        filter.insert("chunkIndex".into(), MetaValue::parse_scalar("1"));
        assert!(matches_filter(&Document::new("d", "x").with_meta("chunkIndex", 1usize).metadata, &filter));
    }

    #[test]
    fn chunk_ids_round_trip_parent() {
        let id = chunk_id("doc", 3);
        assert_eq!(id, "doc::chunk3");
        assert!(is_chunk_of(&id, "doc"));
        assert!(!is_chunk_of("doc2::chunk1", "doc"));
        assert!(!is_chunk_of("doc::chunk", "doc"));
        assert!(!is_chunk_of("doc", "doc"));
    }

    #[test]
    fn filter_requires_every_key() {
        let doc = Document::new("a", "x").with_meta("lang", "en").with_meta("year", 2024i64);
        let mut filter = MetadataFilter::new();
        filter.insert("lang".into(), "en".into());
        assert!(matches_filter(&doc.metadata, &filter));
        filter.insert("year".into(), 2023i64.into());
        assert!(!matches_filter(&doc.metadata, &filter));
    }

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(MetaValue::Number(4.0).to_string(), "4");
        assert_eq!(MetaValue::Number(0.25).to_string(), "0.25");
    }
}
