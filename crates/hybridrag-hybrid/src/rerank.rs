use futures::future::join_all;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use hybridrag_core::similarity::cosine_similarity;
use hybridrag_core::traits::Embedder;
use hybridrag_core::types::RankedCandidate;

/// Re-scores fused candidates by cosine(query, content) under one embedder.
///
/// Candidates are embedded concurrently. A failed embedding scores `0.0` for
/// that candidate only; a failed query embedding scores every candidate `0.0`
/// and leaves the fused order intact.
pub struct Reranker {
    embedder: Arc<dyn Embedder>,
}

impl Reranker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self { Self { embedder } }

    /// Sorted by `transformer_score` descending (ties keep incoming order), truncated to `top_k`.
    pub async fn rerank(&self, query: &str, candidates: Vec<RankedCandidate>, top_k: usize) -> Vec<RankedCandidate> {
        if candidates.is_empty() || top_k == 0 { return Vec::new(); }
        let query_vec = match self.embedder.embed(query).await {
            Ok(v) => Some(v),
            Err(e) => { warn!("query embedding failed, keeping fused order: {}", e); None }
        };
        let scores = join_all(candidates.iter().map(|c| self.score(query_vec.as_deref(), c))).await;

        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .zip(scores)
            .map(|(mut c, s)| { c.transformer_score = s; c })
            .collect();
        ranked.sort_by(|a, b| b.transformer_score.partial_cmp(&a.transformer_score).unwrap_or(Ordering::Equal));
        ranked.truncate(top_k);
        debug!(kept = ranked.len(), "re-ranked");
        ranked
    }

    async fn score(&self, query_vec: Option<&[f32]>, candidate: &RankedCandidate) -> f32 {
        let Some(q) = query_vec else { return 0.0 };
        match self.embedder.embed(&candidate.content).await {
            Ok(v) => cosine_similarity(q, &v),
            Err(e) => { warn!(id = %candidate.id, "candidate embedding failed, scoring 0: {}", e); 0.0 }
        }
    }
}
