//! `emberbot onboard` — First-time setup.

use anyhow::Context;
use emberbot_config::AppConfig;

const STARTER_CORPUS: &str = "\
Your code has more bugs than a rainforest, and at least the rainforest has documentation.
You call it a side project. Git calls it a graveyard of initial commits.

You debug with print statements and prayer, and only one of them works.
Your stack overflow reputation is the only thing in your life that ever overflowed.

You said you'd hit the gym in January. The gym is still waiting, and so is January.
Your protein shake has a better work ethic than you.

Your resume lists 'team player'. Your commit history lists 'fixed it myself at 3am'.
You've been 'almost done' with that side hustle since the last bull market.

You trained a model on your own messages and it learned to procrastinate.
Your neural network has more layers than your personality.
";

pub async fn run() -> anyhow::Result<()> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let config = AppConfig::load().unwrap_or_default();
    let data_dir = config.retrieval.corpus_path();

    println!("🔥 emberbot — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Cannot create {}", config_dir.display()))?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Cannot create {}", data_dir.display()))?;
        println!("✅ Created corpus directory: {}", data_dir.display());
    }

    let starter = data_dir.join("roasts.txt");
    let has_corpus = std::fs::read_dir(&data_dir)?
        .filter_map(Result::ok)
        .any(|e| e.path().extension().is_some_and(|ext| ext == "txt"));
    if !has_corpus {
        std::fs::write(&starter, STARTER_CORPUS)?;
        println!("✅ Wrote starter corpus: {}", starter.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set GROQ_KEY or add api_key to {}", config_path.display());
        println!("   2. Drop .txt roast material into {}", data_dir.display());
        println!("   3. Run: emberbot chat\n");
    }

    println!("🎉 Setup complete! Run `emberbot chat` to get roasted.\n");

    Ok(())
}
