//! Brute-force keyword scan over a full document listing.
//!
//! Case-insensitive substring match, no tokenization. It catches exact terms
//! that embeddings can rank poorly; hits keep listing order.

use hybridrag_core::types::{Document, SearchHit, SourceKind, KEYWORD_DISTANCE};

pub fn keyword_scan(documents: Vec<Document>, query: &str) -> Vec<SearchHit> {
    keyword_scan_with_distance(documents, query, KEYWORD_DISTANCE)
}

/// As [`keyword_scan`], tagging hits with `distance`. A blank query matches nothing.
pub fn keyword_scan_with_distance(documents: Vec<Document>, query: &str, distance: f32) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() { return Vec::new(); }
    documents
        .into_iter()
        .filter(|d| d.content.to_lowercase().contains(&needle))
        .map(|d| SearchHit::from_document(d, distance, SourceKind::Keyword))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<Document> {
        vec![
            Document::new("a", "Building a Fire in wet weather"),
            Document::new("b", "Water purification"),
            Document::new("c", "firewood storage and FIRE safety"),
        ]
    }

    #[test]
    fn matches_case_insensitively_in_listing_order() {
        let hits = keyword_scan(docs(), "fire");
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert!(hits.iter().all(|h| h.distance == KEYWORD_DISTANCE && h.source == SourceKind::Keyword));
    }

    #[test]
    fn whole_query_is_one_substring() {
        assert!(keyword_scan(docs(), "fire water").is_empty());
        assert_eq!(keyword_scan(docs(), "WET WEATHER").len(), 1);
    }

    #[test]
    fn blank_query_matches_nothing() {
        assert!(keyword_scan(docs(), "   ").is_empty());
    }
}
