//! Mirror runtime reflecting execution records into a Discord guild.
//!
//! One run per accepted request: lazily create the per-device category and
//! per-session text channel, then upsert the pinned Info summary and the
//! Executed-In summary among the channel's most recent messages.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use tally_store::{ExecutionRecord, ExecutionStore};

use crate::api_client::DiscordApiClient;

/// Prefix identifying the games summary message among recent messages.
pub const GAMES_SUMMARY_MARKER: &str = "**Executed In:**";

/// How many recent messages the summary search inspects.
const MESSAGE_SEARCH_WINDOW: usize = 10;

pub struct MirrorRunner {
    client: DiscordApiClient,
    store: Arc<ExecutionStore>,
    guild_id: String,
    ready: bool,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MirrorRunner {
    /// `ready` reports whether the startup login probe succeeded; a runner
    /// that is not ready drops every mirror run silently, matching a failed
    /// bot login.
    pub fn new(
        client: DiscordApiClient,
        store: Arc<ExecutionStore>,
        guild_id: String,
        ready: bool,
    ) -> Self {
        Self {
            client,
            store,
            guild_id,
            ready,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Mirrors the record for `key` into the guild. Runs for the same key are
    /// serialized behind a per-key lock so two rapid requests cannot race the
    /// lazy category/channel creation.
    pub async fn mirror(&self, key: &str, hardware_id: &str, session_id: &str) -> Result<()> {
        if !self.ready {
            return Ok(());
        }
        let lock = self.key_lock(key).await;
        let _serialized = lock.lock().await;

        let Some(record) = self.store.snapshot(key).await else {
            return Ok(());
        };

        let category_id = match record.category_id {
            Some(id) => id,
            None => {
                let id = self
                    .client
                    .create_category(&self.guild_id, hardware_id)
                    .await
                    .context("category creation failed")?;
                self.store.set_category_id(key, &id).await?;
                tracing::debug!(%key, category_id = %id, "created mirror category");
                id
            }
        };
        self.client.fetch_channel(&category_id).await?;

        let channel_id = match record.channel_id {
            Some(id) => id,
            None => {
                let id = self
                    .client
                    .create_text_channel(&self.guild_id, session_id, &category_id)
                    .await
                    .context("text channel creation failed")?;
                self.store.set_channel_id(key, &id).await?;
                tracing::debug!(%key, channel_id = %id, "created mirror channel");
                id
            }
        };
        self.client.fetch_channel(&channel_id).await?;

        let messages = self
            .client
            .fetch_recent_messages(&channel_id, MESSAGE_SEARCH_WINDOW)
            .await?;
        let pinned_message = messages.iter().find(|message| message.pinned);
        let games_message = messages
            .iter()
            .find(|message| message.content.starts_with(GAMES_SUMMARY_MARKER));

        // Re-read so the rendered counters include any requests recorded
        // while the creation steps were in flight.
        let Some(record) = self.store.snapshot(key).await else {
            return Ok(());
        };
        let info_text = render_info_summary(&record);
        let games_text = render_games_summary(&record);

        match pinned_message {
            Some(message) => {
                self.client
                    .edit_message(&channel_id, &message.id, &info_text)
                    .await?;
            }
            None => {
                let sent = self.client.create_message(&channel_id, &info_text).await?;
                self.client.pin_message(&channel_id, &sent.id).await?;
                self.store.set_message_id(key, &sent.id).await?;
            }
        }

        match games_message {
            Some(message) => {
                self.client
                    .edit_message(&channel_id, &message.id, &games_text)
                    .await?;
            }
            None => {
                let sent = self.client.create_message(&channel_id, &games_text).await?;
                self.store.set_game_message_id(key, &sent.id).await?;
            }
        }

        Ok(())
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Pinned Info summary block.
pub fn render_info_summary(record: &ExecutionRecord) -> String {
    format!(
        "**Info:**\n- **Origins:** {}\n- **User:** {}\n- **Display Name:** {}\n- **Created:** <t:{}:R>\n- **Executions:** {}",
        record.origins.join(", "),
        record.user.as_deref().unwrap_or("unknown"),
        record.display_name.as_deref().unwrap_or("unknown"),
        record.created_timestamp.as_deref().unwrap_or("0"),
        record.executions,
    )
}

/// Executed-In summary block, one game per line.
pub fn render_games_summary(record: &ExecutionRecord) -> String {
    let mut lines = Vec::with_capacity(record.games.len().saturating_add(1));
    lines.push(GAMES_SUMMARY_MARKER.to_string());
    for (game, count) in &record.games {
        lines.push(format!("{game}, x{count}"));
    }
    lines.join("\n")
}
