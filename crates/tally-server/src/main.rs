//! Process bootstrap: CLI, tracing, store load, Discord login, serve loop.

mod bootstrap_helpers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use tally_discord::{DiscordApiClient, MirrorRunner, DISCORD_API_BASE};
use tally_gateway::{run_ingest_server, GatewayState};
use tally_store::{ExecutionStore, FileBackend};

use crate::bootstrap_helpers::init_tracing;

/// Guild the reference deployment mirrors into.
const DEFAULT_GUILD_ID: &str = "1357180868271149137";

#[derive(Debug, Parser)]
#[command(
    name = "tally-server",
    about = "Webhook service recording execution check-ins and mirroring summaries into Discord",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "PORT",
        default_value_t = 3000,
        help = "Listening port for the ingest endpoint"
    )]
    port: u16,

    #[arg(
        long = "discord-token",
        env = "DISCORD_TOKEN",
        help = "Discord bot token for the mirror session; mirroring stays disabled without it"
    )]
    discord_token: Option<String>,

    #[arg(
        long = "guild-id",
        env = "TALLY_GUILD_ID",
        default_value = DEFAULT_GUILD_ID,
        help = "Guild the mirror creates categories and channels in"
    )]
    guild_id: String,

    #[arg(
        long = "data-file",
        env = "TALLY_DATA_FILE",
        default_value = "executionData.json",
        help = "Path of the JSON store document"
    )]
    data_file: PathBuf,

    #[arg(
        long = "discord-api-base",
        env = "TALLY_DISCORD_API_BASE",
        default_value = DISCORD_API_BASE,
        help = "Discord REST API base URL"
    )]
    discord_api_base: String,

    #[arg(
        long = "request-timeout-ms",
        env = "TALLY_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        help = "Per-request timeout for Discord API calls"
    )]
    request_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // A malformed store document aborts startup rather than silently
    // continuing with an empty map.
    let backend = Arc::new(FileBackend::new(cli.data_file.clone()));
    let store = Arc::new(
        ExecutionStore::load(backend)
            .with_context(|| format!("failed to load store {}", cli.data_file.display()))?,
    );

    let token = cli.discord_token.unwrap_or_default();
    let client = DiscordApiClient::new(cli.discord_api_base, token.clone(), cli.request_timeout_ms)?;
    let ready = if token.trim().is_empty() {
        tracing::warn!("no discord token provided; mirroring disabled");
        false
    } else {
        match client.resolve_bot_user().await {
            Ok(user) => {
                println!(
                    "discord mirror ready: bot_id={} username={}",
                    user.id,
                    user.username.as_deref().unwrap_or("-")
                );
                true
            }
            Err(error) => {
                // No retry: a failed login leaves the mirror permanently off
                // for this process lifetime.
                tracing::warn!(%error, "discord login failed; mirroring disabled");
                false
            }
        }
    };

    let mirror = Arc::new(MirrorRunner::new(
        client,
        Arc::clone(&store),
        cli.guild_id,
        ready,
    ));
    let state = Arc::new(GatewayState { store, mirror });
    run_ingest_server(&format!("0.0.0.0:{}", cli.port), state).await
}
