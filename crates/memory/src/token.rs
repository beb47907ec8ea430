//! Token counting for the history budget.

/// Something that can count language-model tokens in a string.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Word-count approximation: ⌊words × 1.3 + 0.5⌋.
///
/// Used whenever no real tokenizer is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordApprox;

impl TokenCounter for WordApprox {
    fn count(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f64 * 1.3 + 0.5) as usize
    }
}

/// Approximate token count of `text`.
pub fn count_tokens(text: &str) -> usize {
    WordApprox.count(text)
}

/// HuggingFace tokenizer, counting real encoding length.
#[cfg(feature = "local")]
pub struct HfTokenCounter {
    tokenizer: tokenizers::Tokenizer,
}

#[cfg(feature = "local")]
impl HfTokenCounter {
    pub fn new(tokenizer: tokenizers::Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Fetch `tokenizer.json` for `model` from the HuggingFace Hub cache. Blocking.
    pub fn from_hub(model: &str) -> Result<Self, String> {
        let repo_id = if model.contains('/') {
            model.to_string()
        } else {
            format!("sentence-transformers/{model}")
        };
        let api = hf_hub::api::sync::Api::new().map_err(|e| e.to_string())?;
        let path = api
            .model(repo_id)
            .get("tokenizer.json")
            .map_err(|e| e.to_string())?;
        let tokenizer = tokenizers::Tokenizer::from_file(&path).map_err(|e| e.to_string())?;
        Ok(Self::new(tokenizer))
    }
}

#[cfg(feature = "local")]
impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                tracing::debug!(error = %e, "Tokenizer failed, using word approximation");
                WordApprox.count(text)
            }
        }
    }
}
