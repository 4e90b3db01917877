//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_ENGINE__RETRIEVAL__N_RESULTS=4`).
//! The `[engine]` table deserializes into [`EngineConfig`]; every field has a default.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> { Self::load_from_dir(Path::new(".")) }

    pub fn load_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.engine()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The `[engine]` table; missing keys fall back to [`EngineConfig::default`].
    pub fn engine(&self) -> anyhow::Result<EngineConfig> {
        match self.figment.find_value("engine") {
            Ok(_) => self.get("engine"),
            Err(e) if e.missing() => Ok(EngineConfig::default()),
            Err(e) => Err(anyhow::anyhow!("Failed to read engine config: {}", e)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let c = &self.chunking;
        if c.max_size == 0 { return Err(Error::InvalidConfig("chunking.max_size must be > 0".into())); }
        if c.min_size > c.max_size {
            return Err(Error::InvalidConfig(format!("chunking.min_size ({}) exceeds max_size ({})", c.min_size, c.max_size)));
        }
        let k = self.retrieval.rrf_k;
        if !k.is_finite() || k < 0.0 { return Err(Error::InvalidConfig(format!("retrieval.rrf_k must be finite and >= 0, got {k}"))); }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_size: usize,
    pub min_size: usize,
    pub use_embedding_chunking: bool,
    /// Cosine threshold between consecutive sentences that forces a boundary in
    /// embedding mode; `None` keeps boundaries size-only.
    pub similarity_break: Option<f32>,
}

impl Default for ChunkingConfig {
    fn default() -> Self { Self { max_size: 1200, min_size: 300, use_embedding_chunking: false, similarity_break: None } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default for single-pass `retrieve`.
    pub n_results: usize,
    /// Default for `hybrid_retrieve`.
    pub hybrid_n_results: usize,
    pub iterative_steps: usize,
    /// RRF smoothing constant: each list contributes `1 / (rrf_k + rank)`.
    pub rrf_k: f32,
    pub keyword_distance: f32,
    /// Vector hits fetched before fusion; `0` means "same as n_results".
    pub candidate_pool: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { n_results: 3, hybrid_n_results: 5, iterative_steps: 2, rrf_k: 0.0, keyword_distance: crate::types::KEYWORD_DISTANCE, candidate_pool: 0 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
