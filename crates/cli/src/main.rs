//! Comanda CLI - Session store migrations and slug tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session store schema
//! comanda migrate
//!
//! # Delete expired sessions
//! comanda sessions purge
//!
//! # Build and inspect URL slugs
//! comanda slug encode "Joe's Grill" abc123
//! comanda slug decode joes-grill-abc123
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "comanda")]
#[command(author, version, about = "Comanda CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session store schema
    Migrate,
    /// Maintain stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Build and inspect URL slugs
    Slug {
        #[command(subcommand)]
        action: SlugAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// Delete expired sessions
    Purge,
}

#[derive(Subcommand)]
enum SlugAction {
    /// Encode a display name and an id into a slug
    Encode {
        /// Display name (e.g., "Joe's Grill")
        name: String,
        /// Entity id
        id: String,
    },
    /// Show the id and approximate name carried by a slug
    Decode {
        /// Slug path segment (e.g., joes-grill-abc123)
        slug: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Sessions { action } => match action {
            SessionsAction::Purge => commands::migrate::purge_expired().await?,
        },
        Commands::Slug { action } => match action {
            SlugAction::Encode { name, id } => commands::slug::encode(&name, &id)?,
            SlugAction::Decode { slug } => commands::slug::decode(&slug),
        },
    }
    Ok(())
}
