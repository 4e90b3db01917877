//! BGE-M3 (XLM-RoBERTa) sentence embeddings with candle.
//!
//! Expects `tokenizer.json`, `config.json` and `pytorch_model.bin` in the model
//! directory. Inference is synchronous and runs on the blocking pool.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub const BGE_M3_DIM: usize = 1024;
const MAX_LEN: usize = 256;

struct ModelInner { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device }

#[derive(Clone)]
pub struct BgeM3Embedder { inner: Arc<ModelInner> }

impl BgeM3Embedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading BGE-M3 model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::ConfigurationMissing(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;
        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| Error::ConfigurationMissing(format!("failed to read {}: {}", config_path.display(), e)))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)
            .map_err(|e| Error::ConfigurationMissing(format!("failed to read weights {}: {}", weights_path.display(), e)))?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        info!("BGE-M3 model loaded");
        Ok(Self { inner: Arc::new(ModelInner { model, tokenizer, device }) })
    }
}

impl ModelInner {
    fn embed_blocking(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let run = || -> candle_core::Result<Vec<f32>> {
            let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
            let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
            let pooled = masked_mean_l2(&hidden, &attention_mask)?;
            pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()
        };
        let v = run().map_err(Error::embedding)?;
        if v.len() != BGE_M3_DIM { return Err(Error::EmbeddingFailure(format!("expected {} dims, got {}", BGE_M3_DIM, v.len()))); }
        let ms = start.elapsed().as_millis();
        if ms > 100 { warn!(ms, "slow embedding"); } else { debug!(ms, "embedded"); }
        Ok(v)
    }
}

#[async_trait]
impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize { BGE_M3_DIM }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inner = self.inner.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.embed_blocking(&text)).await.map_err(Error::embedding)?
    }
}

/// `APP_MODEL_DIR`, then `MODEL_DIR`, then `../models/bge-m3`, then `models/bge-m3`.
pub fn resolve_model_dir() -> Result<PathBuf> {
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { info!(var, dir = %p.display(), "using model dir"); return Ok(p); }
        }
    }
    for candidate in ["../models/bge-m3", "models/bge-m3"] {
        let p = Path::new(candidate);
        if p.exists() { info!(dir = %p.display(), "using model dir"); return Ok(p.to_path_buf()); }
    }
    Err(Error::ConfigurationMissing("could not locate BGE-M3 model directory".into()))
}
