use async_trait::async_trait;

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::Embedder;
use hybridrag_text::{chunk_paragraphs, ChunkOptions, Chunker};

/// Tiny LCG so the paragraph layouts are reproducible.
fn layouts(seed: u64) -> Vec<String> {
    let mut s = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = |m: u64| { s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407); (s >> 33) % m };
    let n = 1 + next(12) as usize;
    (0..n).map(|i| {
        let len = 1 + next(2000) as usize;
        let c = (b'a' + (i % 26) as u8) as char;
        std::iter::repeat(c).take(len).collect()
    }).collect()
}

#[test]
fn paragraph_chunks_reconstruct_the_input() {
    for seed in 0..64 {
        let text = layouts(seed).join("\n\n");
        let chunks = chunk_paragraphs(&text, 1200, 300);
        assert_eq!(chunks.join("\n\n"), text, "seed {seed}");
    }
}

const MAX: usize = 1200;
const MIN: usize = 300;

fn chars(s: &str) -> usize { s.chars().count() }

#[test]
fn paragraph_chunks_respect_size_bounds() {
    for seed in 0..128 {
        let paragraphs = layouts(seed);
        let longest = paragraphs.iter().map(|p| chars(p)).max().unwrap_or(0);
        let chunks = chunk_paragraphs(&paragraphs.join("\n\n"), MAX, MIN);

        // only the first chunk may stay short, and only when its successor
        // could not have taken it in
        for c in chunks.iter().skip(1) { assert!(chars(c) >= MIN, "seed {seed}: short chunk of {}", chars(c)); }
        if let [first, second, ..] = chunks.as_slice() {
            if chars(first) < MIN {
                let next_para = second.split("\n\n").next().unwrap_or_default();
                assert!(chars(first) + 2 + chars(next_para) > MAX, "seed {seed}");
            }
        }
        // one short tail may be folded onto a full or oversized chunk
        for c in &chunks { assert!(chars(c) < MAX.max(longest) + 2 + MIN, "seed {seed}: {} chars", chars(c)); }
    }
}

#[test]
fn oversized_paragraph_stands_alone() {
    let short = "x".repeat(10);
    let huge = "y".repeat(1500);
    let chunks = chunk_paragraphs(&format!("{short}\n\n{huge}"), MAX, MIN);
    assert_eq!(chunks, vec![short, huge.clone()]);

    let tail = "z".repeat(50);
    let chunks = chunk_paragraphs(&format!("{huge}\n\n{tail}"), MAX, MIN);
    assert_eq!(chunks, vec![format!("{huge}\n\n{tail}")]);
}

#[test]
fn chunking_is_restartable() {
    let text = layouts(7).join("\n\n");
    let chunker = Chunker::new(ChunkOptions::sized(500, 100));
    assert_eq!(chunker.chunk(&text), chunker.chunk(&text));
}

/// Two-topic embedder: sentences about cats vs. everything else.
struct TopicEmbedder;

#[async_trait]
impl Embedder for TopicEmbedder {
    fn dim(&self) -> usize { 2 }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(if text.to_lowercase().contains("cat") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
    }
}

struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn dim(&self) -> usize { 2 }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> { Err(Error::EmbeddingFailure("offline".into())) }
}

const TEXT: &str = "Cats purr loudly. Cats nap all day. Dogs bark at night. Dogs dig holes.";

#[tokio::test]
async fn semantic_mode_is_size_only_by_default() {
    let chunker = Chunker::new(ChunkOptions { use_embedding_chunking: true, ..ChunkOptions::sized(1000, 5) });
    let chunks = chunker.chunk_with(TEXT, &TopicEmbedder).await;
    assert_eq!(chunks, vec![TEXT.to_string()]);
}

#[tokio::test]
async fn semantic_mode_breaks_on_topic_shift() {
    let opts = ChunkOptions { use_embedding_chunking: true, similarity_break: Some(0.5), ..ChunkOptions::sized(1000, 5) };
    let chunks = Chunker::new(opts).chunk_with(TEXT, &TopicEmbedder).await;
    assert_eq!(chunks, vec![
        "Cats purr loudly. Cats nap all day.".to_string(),
        "Dogs bark at night. Dogs dig holes.".to_string(),
    ]);
}

#[tokio::test]
async fn semantic_mode_joins_sentences_with_spaces_and_bounds_size() {
    let chunker = Chunker::new(ChunkOptions::sized(40, 10));
    let chunks = chunker.chunk_semantic(TEXT, &TopicEmbedder).await;
    assert_eq!(chunks, vec![
        "Cats purr loudly. Cats nap all day.".to_string(),
        "Dogs bark at night. Dogs dig holes.".to_string(),
    ]);
}

#[tokio::test]
async fn semantic_mode_survives_embedding_failure() {
    let opts = ChunkOptions { similarity_break: Some(0.5), ..ChunkOptions::sized(40, 10) };
    let chunks = Chunker::new(opts).chunk_semantic(TEXT, &BrokenEmbedder).await;
    assert_eq!(chunks.len(), 2);
    assert!(Chunker::default().chunk_semantic("", &BrokenEmbedder).await.is_empty());
}
