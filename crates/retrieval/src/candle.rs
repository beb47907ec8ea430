//! Local sentence embeddings with Candle.
//!
//! Loads a sentence-transformers BERT model (all-MiniLM-L6-v2 by default)
//! from the HuggingFace Hub cache and mean-pools its last hidden state.

use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use emberbot_core::error::RetrievalError;
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;
use tracing::info;

use crate::embedding::{Embedder, l2_normalize};

/// Resolve short aliases to HuggingFace repository ids.
fn resolve_repo(model: &str) -> String {
    if model.contains('/') {
        model.to_string()
    } else {
        format!("sentence-transformers/{model}")
    }
}

struct BertState {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

/// BERT sentence embedder running on the CPU.
pub struct CandleEmbedder {
    state: Arc<BertState>,
    model_name: String,
}

impl CandleEmbedder {
    /// Download (or reuse from cache) and load the model. Blocking.
    pub fn load(model_name: &str) -> Result<Self, RetrievalError> {
        let device = Device::Cpu;
        let repo_id = resolve_repo(model_name);
        info!(model = %repo_id, "Loading local embedding model");

        let api = Api::new().map_err(|e| {
            RetrievalError::BackendUnavailable(format!("HuggingFace Hub unavailable: {e}"))
        })?;
        let repo = api.model(repo_id.clone());
        let fetch = |file: &str| {
            repo.get(file).map_err(|e| {
                RetrievalError::BackendUnavailable(format!("Failed to fetch {file} from {repo_id}: {e}"))
            })
        };

        let config_path = fetch("config.json")?;
        let tokenizer_path = fetch("tokenizer.json")?;
        let weights_path = fetch("model.safetensors")?;

        let config_bytes = std::fs::read(&config_path)
            .map_err(|e| RetrievalError::BackendUnavailable(e.to_string()))?;
        let config: BertConfig = serde_json::from_slice(&config_bytes)
            .map_err(|e| RetrievalError::BackendUnavailable(format!("Bad model config: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| RetrievalError::BackendUnavailable(format!("Failed to load tokenizer: {e}")))?;

        // SAFETY: the weights file is owned by the hub cache and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device) }
            .map_err(|e| RetrievalError::BackendUnavailable(format!("Failed to map weights: {e}")))?;
        let model = BertModel::load(vb, &config)
            .map_err(|e| RetrievalError::BackendUnavailable(format!("Failed to load model: {e}")))?;

        info!(dimension = config.hidden_size, "Local embedding model ready");

        Ok(Self {
            state: Arc::new(BertState {
                model,
                tokenizer,
                device,
                dimension: config.hidden_size,
            }),
            model_name: model_name.to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl BertState {
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let fail = |e: &dyn std::fmt::Display| RetrievalError::EmbeddingFailed(e.to_string());

        let encoding = self.tokenizer.encode(text, true).map_err(|e| fail(&e))?;
        let ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| fail(&e))?;
        let type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| fail(&e))?;

        let output = self
            .model
            .forward(&ids, &type_ids, None)
            .map_err(|e| fail(&e))?;

        // Mean pooling over the token axis
        let (_, n_tokens, _) = output.dims3().map_err(|e| fail(&e))?;
        let pooled = output
            .sum(1)
            .and_then(|t| t / (n_tokens.max(1) as f64))
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| fail(&e))?;

        let mut v = pooled;
        l2_normalize(&mut v);
        Ok(v)
    }
}

#[async_trait]
impl Embedder for CandleEmbedder {
    fn name(&self) -> &str {
        "local"
    }

    fn dimension(&self) -> usize {
        self.state.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let state = Arc::clone(&self.state);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            texts.iter().map(|t| state.embed_one(t)).collect()
        })
        .await
        .map_err(|e| RetrievalError::EmbeddingFailed(format!("Embedding task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_resolves_to_sentence_transformers() {
        assert_eq!(
            resolve_repo("all-MiniLM-L6-v2"),
            "sentence-transformers/all-MiniLM-L6-v2"
        );
        assert_eq!(resolve_repo("BAAI/bge-small-en"), "BAAI/bge-small-en");
    }
}
