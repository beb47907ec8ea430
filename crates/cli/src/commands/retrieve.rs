//! `emberbot retrieve` — Show the roast context a message would pull in.

use anyhow::Context;
use emberbot_config::AppConfig;
use emberbot_retrieval::NO_CONTEXT;

pub async fn run(query: &str, top_k: Option<usize>) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let top_k = top_k.unwrap_or(config.retrieval.top_k).max(1);

    // Only the provider embedding backend needs a provider
    let provider = match emberbot_providers::build_from_config(&config) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::debug!(error = %e, "No provider available for embeddings");
            None
        }
    };
    let service = emberbot_retrieval::service_from_config(&config.retrieval, provider).await;

    println!("🔍 Retrieving context for: \"{query}\"");
    println!("   Corpus:   {}", config.retrieval.corpus_path().display());
    println!("   Backend:  {}", service.embedder_name());
    println!();

    let context = service.search(query, top_k).await;
    if context == NO_CONTEXT {
        println!("  {NO_CONTEXT}");
        println!("  (add .txt files to the corpus folder, or check the embedding backend)");
        return Ok(());
    }

    for (i, chunk) in context.split("\n\n").enumerate() {
        println!("  [{}] {}", i + 1, chunk.replace('\n', "\n      "));
        println!();
    }

    Ok(())
}
