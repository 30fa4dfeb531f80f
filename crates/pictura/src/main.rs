// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod account;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secrecy::SecretString;

use pictura_config::PicturaConfig;
use pictura_core::PicturaError;
use pictura_security::SessionTokens;

/// Pictura - credit ledger and payment webhooks for image generation.
#[derive(Parser, Debug)]
#[command(name = "pictura", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve,
    /// Issue a session token for a user.
    Token {
        user_id: String,
        /// Lifetime in seconds (defaults to auth.token_ttl_secs).
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Inspect or create user accounts.
    Account {
        #[command(subcommand)]
        action: AccountCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Create the user's balance with the starting grant.
    Register { user_id: String },
    /// Print the user's balance.
    Balance { user_id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => pictura_config::load_and_validate_from_path(path),
        None => pictura_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            pictura_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Token { user_id, ttl }) => issue_token(&config, &user_id, ttl),
        Some(Commands::Account { action }) => match action {
            AccountCommand::Register { user_id } => account::register(&config, &user_id).await,
            AccountCommand::Balance { user_id } => account::balance(&config, &user_id).await,
        },
        None => {
            println!("pictura: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn issue_token(
    config: &PicturaConfig,
    user_id: &str,
    ttl: Option<u64>,
) -> Result<(), PicturaError> {
    let secret = config
        .auth
        .session_secret
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| PicturaError::Config("auth.session_secret is not set".to_string()))?;
    if user_id.trim().is_empty() {
        return Err(PicturaError::InvalidRequest(
            "user id must not be empty".to_string(),
        ));
    }
    let tokens = SessionTokens::new(
        SecretString::from(secret.to_string()),
        ttl.unwrap_or(config.auth.token_ttl_secs),
    );
    println!("{}", tokens.issue(user_id)?);
    Ok(())
}
