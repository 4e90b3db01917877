//! Size-bounded chunking on paragraph or sentence boundaries.
//!
//! Both modes share one greedy pass: units are appended to a buffer until the
//! next one would push it past `max_size`, then the buffer is flushed. A second
//! pass folds any chunk shorter than `min_size` into the chunk before it. A unit
//! longer than `max_size` becomes its own chunk and is never cut.
//!
//! Sizes are counted in `char`s, separators included.

use tracing::{debug, warn};

use hybridrag_core::config::ChunkingConfig;
use hybridrag_core::similarity::cosine_similarity;
use hybridrag_core::traits::Embedder;

pub const PARAGRAPH_SEPARATOR: &str = "\n\n";
pub const SENTENCE_SEPARATOR: &str = " ";

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOptions {
    pub max_size: usize,
    pub min_size: usize,
    pub use_embedding_chunking: bool,
    pub similarity_break: Option<f32>,
}

impl Default for ChunkOptions {
    fn default() -> Self { Self::from(&ChunkingConfig::default()) }
}

impl From<&ChunkingConfig> for ChunkOptions {
    fn from(c: &ChunkingConfig) -> Self {
        Self { max_size: c.max_size, min_size: c.min_size, use_embedding_chunking: c.use_embedding_chunking, similarity_break: c.similarity_break }
    }
}

impl ChunkOptions {
    pub fn sized(max_size: usize, min_size: usize) -> Self { Self { max_size, min_size, ..Self::default() } }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    opts: ChunkOptions,
}

impl Chunker {
    pub fn new(opts: ChunkOptions) -> Self { Self { opts } }

    pub fn options(&self) -> &ChunkOptions { &self.opts }

    /// Paragraph mode. Joining the output with `"\n\n"` gives back `text`.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_paragraphs(text, self.opts.max_size, self.opts.min_size)
    }

    /// Embedding mode: sentences joined by single spaces.
    ///
    /// Every sentence is embedded. Boundaries are size-driven unless
    /// `similarity_break` is set, in which case a drop in cosine between
    /// neighbouring sentences also closes a chunk that already holds `min_size`.
    /// If embedding fails the split falls back to size-only.
    pub async fn chunk_semantic(&self, text: &str, embedder: &dyn Embedder) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() { return Vec::new(); }
        let owned: Vec<String> = sentences.iter().map(|s| s.to_string()).collect();
        let breaks = match embedder.embed_batch(&owned).await {
            Ok(embs) => semantic_breaks(&embs, self.opts.similarity_break),
            Err(e) => { warn!("sentence embedding failed, chunking by size only: {}", e); vec![false; sentences.len()] }
        };
        let chunks = accumulate(&sentences, SENTENCE_SEPARATOR, self.opts.max_size, self.opts.min_size, &breaks);
        let merged = merge_small(chunks, SENTENCE_SEPARATOR, self.opts.min_size);
        debug!(sentences = sentences.len(), chunks = merged.len(), "semantic chunking done");
        merged
    }

    /// Dispatch on `use_embedding_chunking`.
    pub async fn chunk_with(&self, text: &str, embedder: &dyn Embedder) -> Vec<String> {
        if self.opts.use_embedding_chunking { self.chunk_semantic(text, embedder).await } else { self.chunk(text) }
    }
}

pub fn chunk_paragraphs(text: &str, max_size: usize, min_size: usize) -> Vec<String> {
    if text.trim().is_empty() { return Vec::new(); }
    let paragraphs: Vec<&str> = text.split(PARAGRAPH_SEPARATOR).collect();
    let chunks = accumulate(&paragraphs, PARAGRAPH_SEPARATOR, max_size, min_size, &[]);
    merge_small(chunks, PARAGRAPH_SEPARATOR, min_size)
}

/// Split after `.`, `!`, `?` or a newline when followed by whitespace.
/// Sentences are trimmed; empty ones are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?' | '\n') { continue; }
        if chars.peek().is_some_and(|&(_, next)| next.is_whitespace()) {
            let end = i + c.len_utf8();
            push_trimmed(&mut out, &text[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut out, &text[start..]);
    out
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, s: &'a str) {
    let s = s.trim();
    if !s.is_empty() { out.push(s); }
}

fn char_len(s: &str) -> usize { s.chars().count() }

fn semantic_breaks(embeddings: &[Vec<f32>], threshold: Option<f32>) -> Vec<bool> {
    let Some(t) = threshold else { return vec![false; embeddings.len()]; };
    (0..embeddings.len())
        .map(|i| i > 0 && cosine_similarity(&embeddings[i - 1], &embeddings[i]) < t)
        .collect()
}

/// Greedy pass. `breaks[i]` requests a boundary before unit `i`, honoured only
/// once the buffer holds at least `min_size`.
fn accumulate(units: &[&str], sep: &str, max_size: usize, min_size: usize, breaks: &[bool]) -> Vec<String> {
    let sep_len = char_len(sep);
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;
    let mut has_units = false;
    for (i, unit) in units.iter().enumerate() {
        let unit_len = char_len(unit);
        let forced = breaks.get(i).copied().unwrap_or(false) && buf_len >= min_size;
        if has_units && (buf_len + sep_len + unit_len > max_size || forced) {
            out.push(std::mem::take(&mut buf));
            buf_len = 0;
            has_units = false;
        }
        if has_units { buf.push_str(sep); buf_len += sep_len; }
        buf.push_str(unit);
        buf_len += unit_len;
        has_units = true;
    }
    if has_units { out.push(buf); }
    out
}

/// Fold chunks shorter than `min_size` into their predecessor. The first chunk
/// has none and is kept as is.
fn merge_small(chunks: Vec<String>, sep: &str, min_size: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match out.last_mut() {
            Some(prev) if char_len(&chunk) < min_size => { prev.push_str(sep); prev.push_str(&chunk); }
            _ => out.push(chunk),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(c: char, n: usize) -> String { std::iter::repeat(c).take(n).collect() }

    #[test]
    fn empty_input_gives_no_chunks() {
        assert!(chunk_paragraphs("", 1200, 300).is_empty());
        assert!(chunk_paragraphs("  \n\n  ", 1200, 300).is_empty());
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn three_paragraph_scenario() {
        let (p1, p2, p3) = (para('a', 700), para('b', 700), para('c', 50));
        let text = [p1.as_str(), p2.as_str(), p3.as_str()].join("\n\n");
        let chunks = chunk_paragraphs(&text, 1200, 300);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], p1);
        assert_eq!(chunks[1], format!("{p2}\n\n{p3}"));
    }

    #[test]
    fn small_tail_merges_into_previous() {
        let (p1, p2, p3) = (para('a', 1000), para('b', 990), para('c', 40));
        let text = [p1.as_str(), p2.as_str(), p3.as_str()].join("\n\n");
        // p3 does not fit beside p2, is flushed alone, then folded back
        let chunks = chunk_paragraphs(&text, 1000, 300);
        assert_eq!(chunks, vec![p1, format!("{p2}\n\n{p3}")]);
    }

    #[test]
    fn oversized_paragraph_is_kept_whole() {
        let big = para('x', 3000);
        let text = format!("{}\n\n{}", para('a', 400), big);
        let chunks = chunk_paragraphs(&text, 1200, 300);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], big);
    }

    #[test]
    fn single_short_chunk_is_returned() {
        assert_eq!(chunk_paragraphs("tiny", 1200, 300), vec!["tiny".to_string()]);
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let s = split_sentences("One. Two!  Three?\nFour\n\nFive 3.5 six");
        assert_eq!(s, vec!["One.", "Two!", "Three?", "Four", "Five 3.5 six"]);
    }

    #[test]
    fn forced_break_waits_for_min_size() {
        let units = ["aaaa", "bb", "cc"];
        let out = accumulate(&units, " ", 100, 5, &[false, true, true]);
        // "aaaa" is below min 5, so the break before "bb" is ignored
        assert_eq!(out, vec!["aaaa bb".to_string(), "cc".to_string()]);
    }
}
