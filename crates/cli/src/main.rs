//! Colloquy CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP API server
//! - `token`   Mint a capability token
//! - `count`   Count tokens in a piece of text
//! - `config`  Show configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "colloquy",
    about = "Colloquy: session context service for conversational memory",
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
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Mint a signed capability token
    Token {
        /// Grant admin access
        #[arg(long)]
        admin: bool,

        /// Restrict to one workspace
        #[arg(short, long)]
        workspace: Option<String>,

        /// Restrict to one session
        #[arg(short, long)]
        session: Option<String>,

        /// Restrict to one peer
        #[arg(short, long)]
        peer: Option<String>,

        /// Expire after this many seconds
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Count tokens in text
    Count {
        text: String,

        /// Also print the token ids
        #[arg(long)]
        ids: bool,
    },

    /// Show the effective configuration
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        defaults: bool,

        /// Print the config file path only
        #[arg(long, conflicts_with = "defaults")]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Token {
            admin,
            workspace,
            session,
            peer,
            ttl,
        } => {
            commands::token::run(commands::token::TokenArgs {
                admin,
                workspace,
                session,
                peer,
                ttl_secs: ttl,
            })
            .await?
        }
        Commands::Count { text, ids } => commands::count::run(text, ids).await?,
        Commands::Config { defaults, path } => {
            if path {
                commands::config_cmd::path().await?
            } else if defaults {
                commands::config_cmd::defaults().await?
            } else {
                commands::config_cmd::show().await?
            }
        }
    }

    Ok(())
}
