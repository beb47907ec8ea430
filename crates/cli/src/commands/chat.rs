//! `emberbot chat` — Interactive or single-message roasting.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use emberbot_agent::{ChatEngine, RoastMode};
use emberbot_config::AppConfig;
use emberbot_core::session::SessionId;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    session: SessionId,
    mode: Option<String>,
    stream: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    if !config.has_api_key() && emberbot_providers::router::requires_key(&config.provider) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GROQ_KEY=gsk_...            (default provider)");
        eprintln!("    OPENAI_API_KEY=sk-...       (provider = \"openai\")");
        eprintln!("    EMBERBOT_API_KEY=...        (any provider)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let mut engine = ChatEngine::from_config(&config)
        .await
        .context("Failed to start chat engine")?;
    if let Some(mode) = mode {
        engine = engine.with_roast_mode(RoastMode::parse_lossy(&mode));
    }
    let engine = Arc::new(engine);

    if let Some(msg) = message {
        // Single message mode
        reply(&engine, &session, &msg, stream).await?;
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        emberbot — Roast Mode Engaged 🔥       ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!("  Mode:      {}", engine.settings().roast_mode);
    println!("  Retrieval: {}", engine.retrieval().embedder_name());
    println!("  Session:   {session}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Commands: /profile, /clear, exit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "exit" | "quit" => break,
            "/profile" => {
                println!("\n{}\n", engine.profile(&session).await);
            }
            "/clear" => {
                engine.clear_session(&session).await;
                println!("\n  Memory wiped. Fresh start, same disappointment.\n");
            }
            _ => reply(&engine, &session, &line, stream).await?,
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye! Come back when you've got thicker skin. 👋");
    println!();

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

async fn reply(
    engine: &Arc<ChatEngine>,
    session: &SessionId,
    text: &str,
    stream: bool,
) -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    println!();
    print!("  RoastBot > ");
    out.flush()?;

    if stream {
        let mut rx = engine.chat_stream(session.clone(), text);
        while let Some(fragment) = rx.recv().await {
            print!("{fragment}");
            out.flush()?;
        }
        println!();
    } else {
        println!("{}", engine.chat(session, text).await);
    }
    println!();
    Ok(())
}
