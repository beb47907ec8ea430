//! emberbot CLI — the main entry point.
//!
//! Commands:
//! - `onboard`  — Write the default config and corpus folder
//! - `chat`     — Interactive or single-message roasting
//! - `retrieve` — Show the roast context a message would pull in
//! - `profile`  — Show what the bot has learned about a session
//! - `clear`    — Forget a session
//! - `stats`    — Stored session and turn counts

use clap::{Parser, Subcommand};
use emberbot_core::session::{DEFAULT_SESSION, SessionId};

mod commands;

#[derive(Parser)]
#[command(
    name = "emberbot",
    about = "emberbot — the roast bot that remembers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and corpus folder
    Onboard,

    /// Chat with the roast bot
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Session to continue
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,

        /// Start a fresh session with a random id
        #[arg(long, conflicts_with = "session")]
        new: bool,

        /// Roast mode: savage, funny, friendly, professional, classic
        #[arg(long)]
        mode: Option<String>,

        /// Print the reply in one piece instead of streaming it
        #[arg(long)]
        no_stream: bool,
    },

    /// Print the context retrieved for a query
    Retrieve {
        query: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show the learned user profile of a session
    Profile {
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Clear the memory and profile of a session
    Clear {
        #[arg(short, long, default_value = DEFAULT_SESSION)]
        session: String,
    },

    /// Show storage statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            message,
            session,
            new,
            mode,
            no_stream,
        } => {
            let session = if new {
                SessionId::new()
            } else {
                SessionId::from(session)
            };
            commands::chat::run(message, session, mode, !no_stream).await?
        }
        Commands::Retrieve { query, top_k } => commands::retrieve::run(&query, top_k).await?,
        Commands::Profile { session } => commands::session::profile(&session).await?,
        Commands::Clear { session } => commands::session::clear(&session).await?,
        Commands::Stats => commands::session::stats().await?,
    }

    Ok(())
}
