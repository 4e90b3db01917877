//! hybridrag-hybrid
//!
//! Hybrid retrieval: RRF fusion of vector and keyword hits, cosine re-ranking,
//! and the [`RetrievalEngine`] facade with its iterative multi-hop loop.

pub mod engine;
pub mod fusion;
pub mod render;
pub mod rerank;

pub use engine::{EngineBuilder, HybridQuery, IterativeQuery, RetrievalEngine};
pub use fusion::fuse;
pub use render::{context_string, format_candidates, render_outcome, NO_RESULTS};
pub use rerank::Reranker;
