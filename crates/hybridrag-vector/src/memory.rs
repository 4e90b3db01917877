use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use hybridrag_core::error::Result;
use hybridrag_core::similarity::cosine_similarity;
use hybridrag_core::traits::{Embedder, VectorStore};
use hybridrag_core::types::{Document, SearchHit, SourceKind};

struct Entry { doc: Document, vector: Vec<f32> }

/// Brute-force cosine index held in memory.
///
/// Distance is `1 - cosine`, in `[0, 2]`. Documents keep insertion order;
/// re-upserting an id replaces it in place.
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self { Self { embedder, entries: RwLock::new(Vec::new()) } }

    pub async fn len(&self) -> usize { self.entries.read().await.len() }

    pub async fn is_empty(&self) -> bool { self.len().await == 0 }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() { return Ok(()); }
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        let mut entries = self.entries.write().await;
        for (doc, vector) in documents.iter().zip(vectors) {
            match entries.iter_mut().find(|e| e.doc.id == doc.id) {
                Some(e) => { e.doc = doc.clone(); e.vector = vector; }
                None => entries.push(Entry { doc: doc.clone(), vector }),
            }
        }
        debug!(upserted = documents.len(), total = entries.len(), "memory store upsert");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entries.write().await.retain(|e| e.doc.id != id);
        Ok(())
    }

    async fn query(&self, query_text: &str, n_results: usize) -> Result<Vec<SearchHit>> {
        if n_results == 0 { return Ok(Vec::new()); }
        let q = self.embedder.embed(query_text).await?;
        let entries = self.entries.read().await;
        let mut scored: Vec<(f32, &Entry)> = entries.iter().map(|e| (1.0 - cosine_similarity(&q, &e.vector), e)).collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(n_results)
            .map(|(distance, e)| SearchHit::from_document(e.doc.clone(), distance, SourceKind::Vector))
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        Ok(self.entries.read().await.iter().map(|e| e.doc.clone()).collect())
    }
}
