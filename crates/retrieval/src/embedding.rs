//! Embedding backends.
//!
//! An `Embedder` turns text into fixed-dimension vectors. Backends are chosen
//! once at construction time; a `NullEmbedder` stands in when no real
//! embedding capability exists, which makes the retrieval service fall back to
//! a placeholder index.

use std::sync::Arc;

use async_trait::async_trait;
use emberbot_core::error::RetrievalError;
use emberbot_core::provider::{EmbeddingRequest, Provider};

/// Default embedding dimension (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;

/// A text → vector function.
///
/// Implementations need not be safe for concurrent use; the retrieval service
/// serializes every `embed` call.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend name for logging (e.g., "hashing", "provider", "local").
    fn name(&self) -> &str;

    /// Output dimension.
    fn dimension(&self) -> usize;

    /// Whether this backend can produce embeddings at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;
}

/// Scale `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-8 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

// ── Hashing ────────────────────────────────────────────────────────────

/// Deterministic bag-of-words embedder using the hashing trick.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimension` buckets with a hash-derived sign. Texts sharing words land
/// close together in L2 distance. No model download, always available.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

// ── Provider ───────────────────────────────────────────────────────────

/// Embeds through the completion provider's `/embeddings` endpoint.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimension: usize,
}

/// Inputs per embedding request.
const PROVIDER_BATCH: usize = 64;

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        "provider"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(PROVIDER_BATCH) {
            let response = self
                .provider
                .embed(EmbeddingRequest {
                    model: self.model.clone(),
                    inputs: batch.to_vec(),
                })
                .await
                .map_err(|e| RetrievalError::EmbeddingFailed(e.to_string()))?;

            if response.embeddings.len() != batch.len() {
                return Err(RetrievalError::EmbeddingFailed(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            for v in response.embeddings {
                if v.len() != self.dimension {
                    return Err(RetrievalError::DimensionMismatch {
                        expected: self.dimension,
                        actual: v.len(),
                    });
                }
                out.push(v);
            }
        }
        Ok(out)
    }
}

// ── Null ───────────────────────────────────────────────────────────────

/// Stand-in when no embedding capability is available.
#[derive(Debug, Clone)]
pub struct NullEmbedder {
    dimension: usize,
    reason: String,
}

impl NullEmbedder {
    pub fn new(dimension: usize, reason: impl Into<String>) -> Self {
        Self {
            dimension,
            reason: reason.into(),
        }
    }
}

impl Default for NullEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION, "embeddings disabled")
    }
}

#[async_trait]
impl Embedder for NullEmbedder {
    fn name(&self) -> &str {
        "none"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        Err(RetrievalError::BackendUnavailable(self.reason.clone()))
    }
}
