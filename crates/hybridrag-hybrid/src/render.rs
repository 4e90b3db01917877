//! String forms handed to a generation step.

use hybridrag_core::error::Result;
use hybridrag_core::types::RankedCandidate;

pub const NO_RESULTS: &str = "No relevant documents found.";
pub const RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// `Document {i} (ID: {id}, Distance: {d:.4}):\n{content}` blocks, or [`NO_RESULTS`].
pub fn format_candidates(candidates: &[RankedCandidate]) -> String {
    if candidates.is_empty() { return NO_RESULTS.to_string(); }
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("Document {} (ID: {}, Distance: {:.4}):\n{}", i + 1, c.id, c.distance, c.content))
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

/// Never empty: failures become `Error retrieving documents: ...`.
pub fn render_outcome(outcome: &Result<Vec<RankedCandidate>>) -> String {
    match outcome {
        Ok(c) => format_candidates(c),
        Err(e) => format!("Error retrieving documents: {e}"),
    }
}

/// Candidate contents joined by blank lines; empty when there are none.
pub fn context_string(candidates: &[RankedCandidate]) -> String {
    candidates.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::error::Error;
    use hybridrag_core::types::Metadata;

    fn cand(id: &str, content: &str, distance: f32) -> RankedCandidate {
        RankedCandidate { id: id.into(), content: content.into(), metadata: Metadata::new(), distance, rrf: 1.0, transformer_score: 0.0, vector_rank: Some(1), keyword_rank: None }
    }

    #[test]
    fn formats_numbered_blocks() {
        let out = format_candidates(&[cand("a", "alpha", 0.123456), cand("b", "beta", 0.5)]);
        assert_eq!(out, "Document 1 (ID: a, Distance: 0.1235):\nalpha\n\n---\n\nDocument 2 (ID: b, Distance: 0.5000):\nbeta");
    }

    #[test]
    fn empty_and_error_render_sentinels() {
        assert_eq!(render_outcome(&Ok(vec![])), NO_RESULTS);
        let err = render_outcome(&Err(Error::StoreUnavailable("connection refused".into())));
        assert_eq!(err, "Error retrieving documents: Vector store unavailable: connection refused");
    }

    #[test]
    fn context_joins_contents() {
        assert_eq!(context_string(&[]), "");
        assert_eq!(context_string(&[cand("a", "x", 0.0), cand("b", "y", 0.0)]), "x\n\ny");
    }
}
