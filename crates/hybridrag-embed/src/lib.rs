//! Embedding functions for the retrieval engine.
//!
//! `hash` is a dependency-free deterministic embedder used by default and in
//! tests; `local` (feature `local-model`) runs BGE-M3 through candle. Both are
//! wrapped in a [`CachedEmbedder`] by [`get_default_embedder`].

pub mod cache;
pub mod hash;
#[cfg(feature = "local-model")]
pub mod device;
#[cfg(feature = "local-model")]
pub mod model;
#[cfg(feature = "local-model")]
pub mod pool;
#[cfg(feature = "local-model")]
pub mod tokenize;

use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::Embedder;

pub use cache::{content_hash, CachedEmbedder};
pub use hash::HashEmbedder;
#[cfg(feature = "local-model")]
pub use model::{resolve_model_dir, BgeM3Embedder};
#[cfg(feature = "local-model")]
pub use pool::masked_mean_l2;

pub const DEFAULT_HASH_DIM: usize = 384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Hash,
    Local,
}

impl FromStr for EmbedderKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" | "fake" => Ok(EmbedderKind::Hash),
            "local" | "bge-m3" => Ok(EmbedderKind::Local),
            other => Err(Error::InvalidConfig(format!("unknown embedder '{other}' (expected hash|local)"))),
        }
    }
}

pub fn build_embedder(kind: EmbedderKind, hash_dim: usize) -> Result<Arc<dyn Embedder>> {
    let inner: Arc<dyn Embedder> = match kind {
        EmbedderKind::Hash => { info!(dim = hash_dim, "using hash embedder"); Arc::new(HashEmbedder::new(hash_dim)) }
        EmbedderKind::Local => local_embedder()?,
    };
    Ok(Arc::new(CachedEmbedder::new(inner)))
}

/// Reads `APP_EMBEDDER` (default `hash`) and `APP_EMBED_DIM` (default 384).
pub fn get_default_embedder() -> Result<Arc<dyn Embedder>> {
    let kind = std::env::var("APP_EMBEDDER").ok().map(|v| v.parse()).transpose()?.unwrap_or(EmbedderKind::Hash);
    let dim = match std::env::var("APP_EMBED_DIM") {
        Ok(v) => v.parse().map_err(|_| Error::InvalidConfig(format!("APP_EMBED_DIM is not a number: {v}")))?,
        Err(_) => DEFAULT_HASH_DIM,
    };
    build_embedder(kind, dim)
}

#[cfg(feature = "local-model")]
fn local_embedder() -> Result<Arc<dyn Embedder>> { Ok(Arc::new(BgeM3Embedder::load(&resolve_model_dir()?)?)) }

#[cfg(not(feature = "local-model"))]
fn local_embedder() -> Result<Arc<dyn Embedder>> {
    Err(Error::ConfigurationMissing("local embedder requested but hybridrag-embed was built without `local-model`".into()))
}
