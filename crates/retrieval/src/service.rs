//! The retrieval service: a lazily-built index plus a serialized encoder.
//!
//! The index is built at most once, on first use, even when several callers
//! race to be first. Every call into the embedder goes through a single lock.
//! Searching the built index takes no lock.

use std::sync::Arc;

use emberbot_core::error::RetrievalError;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::chunker::chunk;
use crate::corpus::CorpusSource;
use crate::embedding::Embedder;
use crate::index::{FlatIndex, SearchHit};

/// Returned whenever no context can be retrieved.
pub const NO_CONTEXT: &str = "No roast context available. I'll roast from pure instinct.";

/// Owned retrieval engine. Share it behind an `Arc`.
pub struct RetrievalService {
    source: CorpusSource,
    chunk_size: usize,
    embedder: Arc<dyn Embedder>,
    encode_lock: Mutex<()>,
    index: OnceCell<FlatIndex>,
}

impl RetrievalService {
    pub fn new(source: CorpusSource, chunk_size: usize, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            source,
            chunk_size,
            embedder,
            encode_lock: Mutex::new(()),
            index: OnceCell::new(),
        }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Whether the index has been built yet.
    pub fn is_built(&self) -> bool {
        self.index.initialized()
    }

    /// Build the index now instead of on the first query.
    pub async fn warm_up(&self) -> &FlatIndex {
        self.index().await
    }

    /// Retrieve context for `query` as one text block.
    ///
    /// Never fails: any problem degrades to [`NO_CONTEXT`].
    pub async fn search(&self, query: &str, top_k: usize) -> String {
        match self.search_chunks(query, top_k).await {
            Ok(chunks) if !chunks.is_empty() => chunks.join("\n\n"),
            Ok(_) => NO_CONTEXT.to_string(),
            Err(e) => {
                warn!(error = %e, "Retrieval failed, continuing without context");
                NO_CONTEXT.to_string()
            }
        }
    }

    /// The `top_k` nearest chunk texts, most relevant first.
    pub async fn search_chunks(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        let index = self.index().await;
        let hits = self.search_index(index, query, top_k).await?;
        Ok(hits.into_iter().map(|h| h.text.to_string()).collect())
    }

    /// Like [`search_chunks`](Self::search_chunks) but keeps distances.
    pub async fn search_hits(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit<'_>>, RetrievalError> {
        let index = self.index().await;
        self.search_index(index, query, top_k).await
    }

    async fn search_index<'a>(
        &self,
        index: &'a FlatIndex,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit<'a>>, RetrievalError> {
        if index.is_placeholder() {
            return Ok(Vec::new());
        }
        let mut vectors = self.encode(&[query.to_string()]).await?;
        let query_vec = vectors
            .pop()
            .ok_or_else(|| RetrievalError::EmbeddingFailed("no vector for query".into()))?;
        let hits = index.nearest(&query_vec, top_k)?;
        debug!(hits = hits.len(), top_k, "Retrieved chunks");
        Ok(hits)
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let _guard = self.encode_lock.lock().await;
        self.embedder.embed(texts).await
    }

    async fn index(&self) -> &FlatIndex {
        self.index.get_or_init(|| self.build()).await
    }

    async fn build(&self) -> FlatIndex {
        let dimension = self.embedder.dimension();

        if !self.embedder.is_available() {
            info!(backend = self.embedder.name(), "No embedding backend, using placeholder index");
            return FlatIndex::placeholder(dimension);
        }

        let text = match self.source.load().await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to load corpus, using placeholder index");
                return FlatIndex::placeholder(dimension);
            }
        };

        let chunks = chunk(&text, self.chunk_size);
        if chunks.is_empty() {
            info!("Corpus is empty, using placeholder index");
            return FlatIndex::placeholder(dimension);
        }

        let vectors = match self.encode(&chunks).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to embed corpus, using placeholder index");
                return FlatIndex::placeholder(dimension);
            }
        };

        match FlatIndex::new(chunks, vectors, dimension) {
            Ok(index) => {
                info!(chunks = index.len(), backend = self.embedder.name(), "Retrieval index built");
                index
            }
            Err(e) => {
                warn!(error = %e, "Failed to build index, using placeholder index");
                FlatIndex::placeholder(dimension)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{HashingEmbedder, NullEmbedder};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CORPUS: &str = "\
Your code has more bugs than a python nest.
Git blame was invented for people like you.

Skipping leg day again? The gym misses you.
Your protein shake has more personality than you.

Your resume says team player. Your commits say otherwise.
";

    /// Counts calls and flags any overlap between them.
    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        overlapped: std::sync::atomic::AtomicBool,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashingEmbedder::default(),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                overlapped: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            tokio::task::yield_now().await;
            let out = self.inner.embed(texts).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }
    }

    fn service(corpus: &str) -> RetrievalService {
        RetrievalService::new(
            CorpusSource::Text(corpus.into()),
            300,
            Arc::new(HashingEmbedder::default()),
        )
    }

    #[tokio::test]
    async fn relevant_chunk_ranks_first() {
        let svc = service(CORPUS);
        let chunks = svc.search_chunks("my python code is full of bugs", 3).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].contains("python"));
    }

    #[tokio::test]
    async fn results_are_from_corpus_and_ordered() {
        let svc = service(CORPUS);
        let all = chunk(CORPUS, 300);
        let hits = svc.search_hits("gym protein", 2).await.unwrap();
        assert!(hits.len() <= 2);
        assert!(hits.iter().all(|h| all.iter().any(|c| c == h.text)));
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn search_joins_with_blank_line() {
        let svc = service(CORPUS);
        let text = svc.search("resume commits", 2).await;
        assert_eq!(text.matches("\n\n").count(), 1);
    }

    #[tokio::test]
    async fn empty_corpus_returns_sentinel() {
        let svc = service("");
        assert_eq!(svc.search("anything", 3).await, NO_CONTEXT);
        assert!(svc.warm_up().await.is_placeholder());
    }

    #[tokio::test]
    async fn null_backend_returns_sentinel() {
        let svc = RetrievalService::new(
            CorpusSource::Text(CORPUS.into()),
            300,
            Arc::new(NullEmbedder::default()),
        );
        assert_eq!(svc.search("python", 3).await, NO_CONTEXT);
    }

    #[tokio::test]
    async fn missing_corpus_dir_returns_sentinel() {
        let svc = RetrievalService::new(
            CorpusSource::Directory("/nonexistent/corpus".into()),
            300,
            Arc::new(HashingEmbedder::default()),
        );
        assert_eq!(svc.search("python", 3).await, NO_CONTEXT);
    }

    #[tokio::test]
    async fn index_is_built_once_under_concurrency() {
        let embedder = Arc::new(CountingEmbedder::new());
        let svc = Arc::new(RetrievalService::new(
            CorpusSource::Text(CORPUS.into()),
            300,
            embedder.clone(),
        ));
        assert!(!svc.is_built());

        let mut handles = Vec::new();
        for i in 0..8 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.search(&format!("query {i} python"), 1).await
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert!(svc.is_built());
        // One build call plus one encode per query
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1 + 8);
        assert!(!embedder.overlapped.load(Ordering::SeqCst));
    }
}
