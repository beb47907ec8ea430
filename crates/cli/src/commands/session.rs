//! `emberbot profile | clear | stats` — Inspect and manage stored sessions.
//!
//! These work straight against storage, so they need no API key.

use std::sync::Arc;

use anyhow::Context;
use emberbot_config::AppConfig;
use emberbot_core::session::SessionId;
use emberbot_core::storage::Storage;
use emberbot_profile::UserProfile;

async fn open_storage() -> anyhow::Result<(AppConfig, Arc<dyn Storage>)> {
    let config = AppConfig::load().context("Failed to load config")?;
    let storage = emberbot_memory::storage_from_config(&config.storage)
        .await
        .context("Failed to open storage")?;
    Ok((config, storage))
}

pub async fn profile(session: &str) -> anyhow::Result<()> {
    let (_, storage) = open_storage().await?;
    let id = SessionId::from(session);

    let profile = match storage.load_profile(&id).await? {
        Some(record) => UserProfile::from_storage_record(&record),
        None => {
            println!("No profile stored for session '{session}'.");
            return Ok(());
        }
    };

    println!("🧠 What I know about you ({session})");
    println!("==================================");
    println!("{}", profile.summary());
    Ok(())
}

pub async fn clear(session: &str) -> anyhow::Result<()> {
    let (_, storage) = open_storage().await?;
    let id = SessionId::from(session);

    storage.clear_turns(&id).await?;
    storage.clear_profile(&id).await?;

    println!("🧹 Session '{session}' cleared.");
    Ok(())
}

pub async fn stats() -> anyhow::Result<()> {
    let (config, storage) = open_storage().await?;

    println!("📊 emberbot Storage");
    println!("===================");
    println!("  Backend:    {}", storage.name());
    if config.storage.backend == "sqlite" {
        let path = config.storage.db_path();
        match std::fs::metadata(&path) {
            Ok(meta) => println!(
                "  DB file:    {} ({:.1} KB)",
                path.display(),
                meta.len() as f64 / 1024.0
            ),
            Err(_) => println!("  DB file:    (not created yet)"),
        }
    }
    println!("  Sessions:   {}", storage.session_count().await?);
    println!("  Turns:      {}", storage.total_turns().await?);
    Ok(())
}
