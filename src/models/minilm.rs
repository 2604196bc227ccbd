use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use tokenizers::{Tokenizer, TruncationParams};

use crate::embedder::Embedder;
use crate::error::{MatchError, Result};
use crate::types::Embedding;

const MAX_LENGTH: usize = 256;

#[derive(serde::Deserialize)]
struct Dims {
    hidden_size: usize,
}

/// Sentence embedder: BERT forward pass, mean pooling, L2 normalisation.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl MiniLmEmbedder {
    pub fn load(model_id: &str, revision: &str, use_gpu: bool) -> Result<Self> {
        let started = Instant::now();
        let device = super::select_device(use_gpu);
        let [config_path, tokenizer_path, weights_path] = super::fetch_files(
            model_id,
            revision,
            ["config.json", "tokenizer.json", "model.safetensors"],
        )?;

        let raw_config = std::fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&raw_config)
            .map_err(|e| MatchError::ModelLoad(format!("bert config: {e}")))?;
        let Dims { hidden_size } = serde_json::from_str(&raw_config)
            .map_err(|e| MatchError::ModelLoad(format!("bert config: {e}")))?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| MatchError::ModelLoad(format!("tokenizer: {e}")))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| MatchError::ModelLoad(format!("tokenizer: {e}")))?;

        // SAFETY: the hub cache file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device) }
            .map_err(|e| MatchError::ModelLoad(e.to_string()))?;
        let model =
            BertModel::load(vb, &config).map_err(|e| MatchError::ModelLoad(e.to_string()))?;

        tracing::info!(
            model = model_id,
            device = ?device,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded embedding model"
        );
        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size,
        })
    }

    fn forward(&self, token_ids: &[u32]) -> candle_core::Result<Vec<f32>> {
        let token_ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;
        let hidden = self.model.forward(&token_ids, &token_type_ids, None)?;

        let (_batch, n_tokens, _hidden) = hidden.dims3()?;
        let pooled = (hidden.sum(1)? / n_tokens as f64)?;
        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12f32, f32::MAX)?;
        pooled.broadcast_div(&norm)?.squeeze(0)?.to_vec1::<f32>()
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| MatchError::Embedding(format!("tokenize: {e}")))?;
        if encoding.get_ids().is_empty() {
            return Err(MatchError::Embedding("tokenizer produced no tokens".into()));
        }
        self.forward(encoding.get_ids())
            .map_err(|e| MatchError::Embedding(e.to_string()))
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.hidden_size)
    }
}
