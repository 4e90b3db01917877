//! Reciprocal Rank Fusion of the vector and keyword result lists.
//!
//! Each list contributes `1 / (k + rank)` (rank from 1) to every id it holds;
//! the default `k = 0` gives plain `1 / rank`. Content and metadata come from
//! whichever list saw the id first, which is always the vector list when both did.

use std::cmp::Ordering;
use std::collections::HashMap;

use hybridrag_core::types::{matches_filter, MetadataFilter, RankedCandidate, SearchHit, SourceKind};

pub fn rrf_contribution(rank: usize, k: f32) -> f32 { 1.0 / (k + rank as f32) }

/// Merge both lists by id, apply `filter` (AND, exact match) and order by RRF.
///
/// Ties keep vector rank order (vector hits before keyword-only ones), then id.
pub fn fuse(vector: Vec<SearchHit>, keyword: Vec<SearchHit>, filter: Option<&MetadataFilter>, k: f32) -> Vec<RankedCandidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<RankedCandidate> = Vec::with_capacity(vector.len() + keyword.len());

    for (list, kind) in [(vector, SourceKind::Vector), (keyword, SourceKind::Keyword)] {
        for (i, hit) in list.into_iter().enumerate() {
            let rank = i + 1;
            let idx = *index.entry(hit.id.clone()).or_insert_with(|| {
                merged.push(RankedCandidate {
                    id: hit.id.clone(),
                    content: hit.content.clone(),
                    metadata: hit.metadata.clone(),
                    distance: hit.distance,
                    rrf: 0.0,
                    transformer_score: 0.0,
                    vector_rank: None,
                    keyword_rank: None,
                });
                merged.len() - 1
            });
            let c = &mut merged[idx];
            let slot = match kind { SourceKind::Vector => &mut c.vector_rank, SourceKind::Keyword => &mut c.keyword_rank };
            // an id repeated inside one list only counts once
            if slot.is_some() { continue; }
            *slot = Some(rank);
            c.rrf += rrf_contribution(rank, k);
            if kind == SourceKind::Vector { c.distance = hit.distance; }
        }
    }

    if let Some(f) = filter { merged.retain(|c| matches_filter(&c.metadata, f)); }
    merged.sort_by(compare_fused);
    merged
}

fn compare_fused(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.rrf.partial_cmp(&a.rrf).unwrap_or(Ordering::Equal)
        .then_with(|| match (a.vector_rank, b.vector_rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}
