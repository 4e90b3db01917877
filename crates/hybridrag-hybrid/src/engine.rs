//! The retrieval facade: chunked ingest, single-pass and hybrid queries, and
//! the iterative retrieve → generate loop.
//!
//! Query paths are best-effort. A failing store call is logged, recorded in the
//! caller's [`RetrievalContext`] and treated as "no results" for that source;
//! only when every source fails does the call return an error.

use std::sync::Arc;
use tracing::{debug, info, warn};

use hybridrag_core::config::EngineConfig;
use hybridrag_core::context::{EntryKind, EntryStatus, RetrievalContext};
use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::{Embedder, Generator, VectorStore};
use hybridrag_core::types::{chunk_id, is_chunk_of, Document, DocumentInput, MetaValue, MetadataFilter, RankedCandidate, SearchHit};
use hybridrag_text::{keyword_scan_with_distance, ChunkOptions, Chunker};

use crate::fusion::{fuse, rrf_contribution};
use crate::render::{context_string, render_outcome};
use crate::rerank::Reranker;

/// Options for [`RetrievalEngine::hybrid_retrieve`]. `None` fields use the engine config.
#[derive(Debug, Clone, Default)]
pub struct HybridQuery {
    pub query: String,
    pub n_results: Option<usize>,
    pub filter: Option<MetadataFilter>,
}

impl HybridQuery {
    pub fn new(query: impl Into<String>) -> Self { Self { query: query.into(), ..Self::default() } }
    pub fn n_results(mut self, n: usize) -> Self { self.n_results = Some(n); self }
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.filter.get_or_insert_with(MetadataFilter::new).insert(key.into(), value.into());
        self
    }
}

/// Options for [`RetrievalEngine::iterative_retrieve`]. `None` fields use the engine config.
#[derive(Debug, Clone, Default)]
pub struct IterativeQuery {
    pub query: String,
    pub steps: Option<usize>,
    pub n_results: Option<usize>,
    pub filter: Option<MetadataFilter>,
}

impl IterativeQuery {
    pub fn new(query: impl Into<String>) -> Self { Self { query: query.into(), ..Self::default() } }
    pub fn steps(mut self, steps: usize) -> Self { self.steps = Some(steps); self }
    pub fn n_results(mut self, n: usize) -> Self { self.n_results = Some(n); self }
}

#[derive(Default)]
pub struct EngineBuilder {
    store: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn Embedder>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self { self.store = Some(store); self }
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self { self.embedder = Some(embedder); self }
    pub fn config(mut self, config: EngineConfig) -> Self { self.config = config; self }

    pub fn build(self) -> Result<RetrievalEngine> {
        let store = self.store.ok_or_else(|| Error::ConfigurationMissing("no vector store configured".into()))?;
        let embedder = self.embedder.ok_or_else(|| Error::ConfigurationMissing("no embedding function configured".into()))?;
        self.config.validate()?;
        Ok(RetrievalEngine { store, reranker: Reranker::new(embedder.clone()), embedder, config: self.config })
    }
}

pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    reranker: Reranker,
    config: EngineConfig,
}

impl RetrievalEngine {
    pub fn builder() -> EngineBuilder { EngineBuilder::default() }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Sanitize metadata and upsert. Re-upserting an id replaces it.
    pub async fn upsert(&self, documents: &[DocumentInput]) -> Result<()> {
        let docs: Vec<_> = documents.iter().map(DocumentInput::sanitize).collect();
        self.store.upsert(&docs).await
    }

    /// Chunk `document` and upsert the chunks as `<id>::chunk<n>`; returns their ids.
    ///
    /// Chunks from an earlier, longer version of the same parent are removed.
    /// `opts` defaults to the engine's chunking config.
    pub async fn upsert_with_chunks(&self, document: &DocumentInput, opts: Option<ChunkOptions>) -> Result<Vec<String>> {
        let opts = opts.unwrap_or_else(|| ChunkOptions::from(&self.config.chunking));
        let pieces = Chunker::new(opts).chunk_with(&document.content, self.embedder.as_ref()).await;
        let parent = document.sanitize();
        let total = pieces.len();
        let chunks: Vec<_> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let mut metadata = parent.metadata.clone();
                metadata.insert("chunkIndex".into(), (i + 1).into());
                metadata.insert("chunkTotal".into(), total.into());
                metadata.insert("parentId".into(), parent.id.as_str().into());
                Document { id: chunk_id(&parent.id, i + 1), content, metadata }
            })
            .collect();
        self.store.upsert(&chunks).await?;
        let stale = self.chunk_ids(&parent.id).await?.into_iter().filter(|id| !chunks.iter().any(|c| &c.id == id));
        for id in stale { self.store.delete(&id).await?; }
        info!(parent = %parent.id, chunks = total, "chunked upsert");
        Ok(chunks.into_iter().map(|c| c.id).collect())
    }

    pub async fn delete(&self, id: &str) -> Result<()> { self.store.delete(id).await }

    /// Delete `parent_id` and every `parent_id::chunk<n>`; returns how many chunks went.
    pub async fn delete_with_chunks(&self, parent_id: &str) -> Result<usize> {
        let ids = self.chunk_ids(parent_id).await?;
        for id in &ids { self.store.delete(id).await?; }
        self.store.delete(parent_id).await?;
        Ok(ids.len())
    }

    async fn chunk_ids(&self, parent_id: &str) -> Result<Vec<String>> {
        Ok(self.store.list_ids().await?.into_iter().filter(|id| is_chunk_of(id, parent_id)).collect())
    }

    /// Single-pass vector search rendered for a prompt. Never fails; see [`render_outcome`].
    pub async fn retrieve(&self, query: &str, n_results: Option<usize>, ctx: &mut RetrievalContext) -> String {
        render_outcome(&self.try_retrieve(query, n_results, ctx).await)
    }

    /// Vector hits in store order with `rrf = 1/(k + rank)`; no keyword scan, no re-ranking.
    pub async fn try_retrieve(&self, query: &str, n_results: Option<usize>, ctx: &mut RetrievalContext) -> Result<Vec<RankedCandidate>> {
        let n = n_results.unwrap_or(self.config.retrieval.n_results);
        let hits = match self.store.query(query, n).await {
            Ok(h) => h,
            Err(e) => {
                warn!("vector query failed: {}", e);
                ctx.record(EntryKind::Retrieve, query, EntryStatus::Failed { message: e.to_string() });
                return Err(e);
            }
        };
        let candidates: Vec<_> = hits.into_iter().take(n).enumerate().map(|(i, h)| self.single_source(h, i + 1)).collect();
        self.finish(EntryKind::Retrieve, query, &candidates, ctx);
        Ok(candidates)
    }

    fn single_source(&self, hit: SearchHit, rank: usize) -> RankedCandidate {
        RankedCandidate {
            rrf: rrf_contribution(rank, self.config.retrieval.rrf_k),
            id: hit.id,
            content: hit.content,
            metadata: hit.metadata,
            distance: hit.distance,
            transformer_score: 0.0,
            vector_rank: Some(rank),
            keyword_rank: None,
        }
    }

    /// Vector search + keyword scan, fused with RRF and re-ranked by cosine.
    ///
    /// Errors only when both the vector query and the document listing fail.
    pub async fn hybrid_retrieve(&self, q: &HybridQuery, ctx: &mut RetrievalContext) -> Result<Vec<RankedCandidate>> {
        let cfg = &self.config.retrieval;
        let n = q.n_results.unwrap_or(cfg.hybrid_n_results);
        let pool = n.max(cfg.candidate_pool);

        let vector = match self.store.query(&q.query, pool).await {
            Ok(h) => Ok(h),
            Err(e) => {
                warn!("vector query failed, continuing with keyword hits: {}", e);
                ctx.record(EntryKind::VectorQuery, &q.query, EntryStatus::Failed { message: e.to_string() });
                Err(e)
            }
        };
        let keyword = match self.store.list_all().await {
            Ok(docs) => Ok(keyword_scan_with_distance(docs, &q.query, cfg.keyword_distance)),
            Err(e) => {
                warn!("document listing failed, continuing with vector hits: {}", e);
                ctx.record(EntryKind::KeywordScan, &q.query, EntryStatus::Failed { message: e.to_string() });
                Err(e)
            }
        };
        let (vector, keyword) = match (vector, keyword) {
            (Err(v), Err(k)) => {
                let err = Error::StoreUnavailable(format!("vector query: {v}; keyword scan: {k}"));
                ctx.record(EntryKind::HybridRetrieve, &q.query, EntryStatus::Failed { message: err.to_string() });
                return Err(err);
            }
            (v, k) => (v.unwrap_or_default(), k.unwrap_or_default()),
        };
        debug!(vector = vector.len(), keyword = keyword.len(), "hybrid sources");

        let fused = fuse(vector, keyword, q.filter.as_ref(), cfg.rrf_k);
        let ranked = self.reranker.rerank(&q.query, fused, n).await;
        self.finish(EntryKind::HybridRetrieve, &q.query, &ranked, ctx);
        Ok(ranked)
    }

    /// Exactly `steps` rounds of hybrid retrieval. Each round's context (the
    /// candidates' contents) is returned in order and fed with the current query
    /// to `generator`, whose output becomes the next query. Empty rounds yield
    /// `""`; a failed generation keeps the current query.
    pub async fn iterative_retrieve(&self, q: &IterativeQuery, generator: &dyn Generator, ctx: &mut RetrievalContext) -> Vec<String> {
        let steps = q.steps.unwrap_or(self.config.retrieval.iterative_steps);
        let mut contexts = Vec::with_capacity(steps);
        let mut current = q.query.clone();
        for step in 1..=steps {
            let round = HybridQuery { query: current.clone(), n_results: q.n_results, filter: q.filter.clone() };
            let candidates = match self.hybrid_retrieve(&round, ctx).await {
                Ok(c) => c,
                Err(e) => { warn!(step, "retrieval failed, continuing with empty context: {}", e); Vec::new() }
            };
            let context = context_string(&candidates);
            ctx.record(EntryKind::IterativeStep, &current, status_for(&candidates));
            let next = generator.generate(&current, &context).await;
            current = match next {
                Ok(next) => next,
                Err(e) => { warn!(step, "generation failed, reusing query: {}", e); current }
            };
            debug!(step, next_query = %current, "iteration done");
            contexts.push(context);
        }
        contexts
    }

    fn finish(&self, kind: EntryKind, query: &str, candidates: &[RankedCandidate], ctx: &mut RetrievalContext) {
        ctx.record(kind, query, status_for(candidates));
        if !candidates.is_empty() { ctx.add_references(candidates); }
    }
}

fn status_for(candidates: &[RankedCandidate]) -> EntryStatus {
    if candidates.is_empty() { EntryStatus::Empty } else { EntryStatus::Found { count: candidates.len() } }
}
