//! Retrieval for emberbot.
//!
//! Corpus text is chunked, embedded and held in a flat nearest-neighbour
//! index. The [`RetrievalService`] builds that index lazily, exactly once, and
//! never lets a failure escape a query: the worst case is [`NO_CONTEXT`].

#[cfg(feature = "local")]
pub mod candle;
pub mod chunker;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod service;

use std::sync::Arc;

use emberbot_config::RetrievalConfig;
use emberbot_core::provider::Provider;
use tracing::warn;

#[cfg(feature = "local")]
pub use candle::CandleEmbedder;
pub use chunker::chunk;
pub use corpus::CorpusSource;
pub use embedding::{Embedder, HashingEmbedder, NullEmbedder, ProviderEmbedder};
pub use index::{FlatIndex, SearchHit};
pub use service::{NO_CONTEXT, RetrievalService};

/// Select an embedding backend from configuration.
///
/// Backends that cannot be set up fall back to [`NullEmbedder`], which turns
/// retrieval into a no-op rather than an error.
pub async fn embedder_from_config(
    config: &RetrievalConfig,
    provider: Option<Arc<dyn Provider>>,
) -> Arc<dyn Embedder> {
    match config.embedding_backend.as_str() {
        "hashing" => Arc::new(HashingEmbedder::new(config.dimension)),
        "provider" => match provider {
            Some(p) => Arc::new(ProviderEmbedder::new(
                p,
                config.embedding_model.clone(),
                config.dimension,
            )),
            None => {
                warn!("Embedding backend 'provider' selected but no provider is configured");
                Arc::new(NullEmbedder::new(config.dimension, "no provider configured"))
            }
        },
        "local" => local_embedder(config).await,
        "none" => Arc::new(NullEmbedder::new(config.dimension, "embeddings disabled")),
        other => {
            warn!(backend = other, "Unknown embedding backend, retrieval disabled");
            Arc::new(NullEmbedder::new(
                config.dimension,
                format!("unknown backend '{other}'"),
            ))
        }
    }
}

#[cfg(feature = "local")]
async fn local_embedder(config: &RetrievalConfig) -> Arc<dyn Embedder> {
    let model = config.embedding_model.clone();
    let loaded = tokio::task::spawn_blocking(move || CandleEmbedder::load(&model)).await;
    match loaded {
        Ok(Ok(embedder)) => Arc::new(embedder),
        Ok(Err(e)) => {
            warn!(error = %e, "Local embedding model unavailable, retrieval disabled");
            Arc::new(NullEmbedder::new(config.dimension, e.to_string()))
        }
        Err(e) => {
            warn!(error = %e, "Local embedding model failed to load, retrieval disabled");
            Arc::new(NullEmbedder::new(config.dimension, e.to_string()))
        }
    }
}

#[cfg(not(feature = "local"))]
async fn local_embedder(config: &RetrievalConfig) -> Arc<dyn Embedder> {
    warn!("Built without the `local` feature, retrieval disabled");
    Arc::new(NullEmbedder::new(
        config.dimension,
        "built without the `local` feature",
    ))
}

/// Build a service from configuration.
pub async fn service_from_config(
    config: &RetrievalConfig,
    provider: Option<Arc<dyn Provider>>,
) -> RetrievalService {
    let embedder = embedder_from_config(config, provider).await;
    RetrievalService::new(
        CorpusSource::Directory(config.corpus_path()),
        config.chunk_size,
        embedder,
    )
}
