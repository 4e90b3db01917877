//! hybridrag-text
//!
//! Text-side building blocks: the chunker (paragraph and sentence modes) and
//! the keyword scan used next to vector search.

pub mod chunker;
pub mod keyword;

pub use chunker::{chunk_paragraphs, split_sentences, ChunkOptions, Chunker};
pub use keyword::{keyword_scan, keyword_scan_with_distance};
