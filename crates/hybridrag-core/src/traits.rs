use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocId, Document, SearchHit};

/// Text → vector. Implementations should return vectors of `dim()` length.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts { out.push(self.embed(t).await?); }
        Ok(out)
    }
}

/// Vector index contract. Errors should be reported as `Error::StoreUnavailable`.
///
/// `query` returns hits ordered by ascending distance; distances are
/// backend-defined and only compared within one result list.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace by id.
    async fn upsert(&self, documents: &[Document]) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn query(&self, query_text: &str, n_results: usize) -> Result<Vec<SearchHit>>;
    /// Every stored document, in a stable order.
    async fn list_all(&self) -> Result<Vec<Document>>;

    async fn list_ids(&self) -> Result<Vec<DocId>> {
        Ok(self.list_all().await?.into_iter().map(|d| d.id).collect())
    }
}

/// (current query, retrieved context) → next query or answer.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, query: &str, context: &str) -> Result<String>;
}

/// Returns the query unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughGenerator;

#[async_trait]
impl Generator for PassthroughGenerator {
    async fn generate(&self, query: &str, _context: &str) -> Result<String> { Ok(query.to_string()) }
}

/// Adapts a plain closure into a [`Generator`].
pub struct FnGenerator<F>(pub F);

#[async_trait]
impl<F> Generator for FnGenerator<F>
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    async fn generate(&self, query: &str, context: &str) -> Result<String> { Ok((self.0)(query, context)) }
}
