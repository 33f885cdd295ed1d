//! Discord integration for the tally service: REST client plus the
//! fire-and-forget mirror runtime invoked per accepted check-in.

pub mod api_client;
pub mod mirror;

pub use api_client::{BotUser, ChannelMessage, DiscordApiClient, GuildChannel};
pub use mirror::{render_games_summary, render_info_summary, MirrorRunner, GAMES_SUMMARY_MARKER};

/// Discord REST API base used in production; tests point at a mock server.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
