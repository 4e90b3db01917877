//! Content-addressed embedding cache.
//!
//! Keys are blake3 hashes of the input text; values live in a bounded moka
//! cache (TinyLFU admission, so frequently asked queries outlive one-off texts).
//! Repeated queries across calls and re-upserts of unchanged chunks are served
//! from memory instead of the model.

use async_trait::async_trait;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use hybridrag_core::error::Result;
use hybridrag_core::traits::Embedder;

pub const DEFAULT_CACHE_CAPACITY: u64 = 4096;

pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache<String, Vec<f32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

pub fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>) -> Self { Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY) }

    pub fn with_capacity(inner: Arc<dyn Embedder>, max_entries: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_entries.max(1)).build();
        Self { inner, cache, hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    /// `(hits, misses)` so far.
    pub fn stats(&self) -> (u64, u64) { (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed)) }

    /// Entry count after pending evictions have been applied.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn lookup(&self, key: &str) -> Option<Vec<f32>> {
        let found = self.cache.get(key);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = content_hash(text);
        if let Some(v) = self.lookup(&key) { return Ok(v); }
        let v = self.inner.embed(text).await?;
        trace!(key = %key, "embedding cached");
        self.cache.insert(key, v.clone());
        Ok(v)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| content_hash(t)).collect();
        let mut out: Vec<Option<Vec<f32>>> = keys.iter().map(|k| self.lookup(k)).collect();
        let missing: Vec<usize> = (0..texts.len()).filter(|&i| out[i].is_none()).collect();
        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed_batch(&batch).await?;
            for (&i, v) in missing.iter().zip(fresh) {
                self.cache.insert(keys[i].clone(), v.clone());
                out[i] = Some(v);
            }
        }
        Ok(out.into_iter().map(Option::unwrap_or_default).collect())
    }
}
