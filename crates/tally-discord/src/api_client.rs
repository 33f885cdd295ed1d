//! Discord REST client used by the mirror runtime.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

/// `GUILD_TEXT` channel type code.
const CHANNEL_TYPE_TEXT: u8 = 0;
/// `GUILD_CATEGORY` channel type code.
const CHANNEL_TYPE_CATEGORY: u8 = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub pinned: bool,
}

/// Thin client over the Discord REST API. Calls are single-shot: remote
/// failures surface to the mirror task, which logs and drops them, and the
/// lazy-create steps resume on the next request for the key.
#[derive(Clone)]
pub struct DiscordApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl DiscordApiClient {
    pub fn new(api_base: String, bot_token: String, request_timeout_ms: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("tally-mirror"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create discord api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
        })
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Login probe; the mirror stays permanently disabled when it fails.
    pub async fn resolve_bot_user(&self) -> Result<BotUser> {
        self.request_json(
            "users/@me",
            self.http
                .get(format!("{}/users/@me", self.api_base))
                .header("authorization", self.authorization()),
        )
        .await
    }

    /// Creates a `GUILD_CATEGORY` channel named after the device identifier.
    pub async fn create_category(&self, guild_id: &str, name: &str) -> Result<String> {
        let channel: GuildChannel = self
            .request_json(
                "guild category create",
                self.http
                    .post(format!("{}/guilds/{guild_id}/channels", self.api_base))
                    .header("authorization", self.authorization())
                    .json(&json!({ "name": name, "type": CHANNEL_TYPE_CATEGORY })),
            )
            .await?;
        Ok(channel.id)
    }

    /// Creates a `GUILD_TEXT` channel parented to an existing category.
    pub async fn create_text_channel(
        &self,
        guild_id: &str,
        name: &str,
        parent_id: &str,
    ) -> Result<String> {
        let channel: GuildChannel = self
            .request_json(
                "guild text channel create",
                self.http
                    .post(format!("{}/guilds/{guild_id}/channels", self.api_base))
                    .header("authorization", self.authorization())
                    .json(&json!({
                        "name": name,
                        "type": CHANNEL_TYPE_TEXT,
                        "parent_id": parent_id,
                    })),
            )
            .await?;
        Ok(channel.id)
    }

    pub async fn fetch_channel(&self, channel_id: &str) -> Result<GuildChannel> {
        self.request_json(
            "channel fetch",
            self.http
                .get(format!("{}/channels/{channel_id}", self.api_base))
                .header("authorization", self.authorization()),
        )
        .await
    }

    /// Most recent messages in the channel, newest first.
    pub async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>> {
        self.request_json(
            "channel messages fetch",
            self.http
                .get(format!("{}/channels/{channel_id}/messages", self.api_base))
                .query(&[("limit", limit.to_string().as_str())])
                .header("authorization", self.authorization()),
        )
        .await
    }

    pub async fn create_message(&self, channel_id: &str, content: &str) -> Result<ChannelMessage> {
        self.request_json(
            "message create",
            self.http
                .post(format!("{}/channels/{channel_id}/messages", self.api_base))
                .header("authorization", self.authorization())
                .json(&json!({ "content": content })),
        )
        .await
    }

    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<()> {
        let _: ChannelMessage = self
            .request_json(
                "message edit",
                self.http
                    .patch(format!(
                        "{}/channels/{channel_id}/messages/{message_id}",
                        self.api_base
                    ))
                    .header("authorization", self.authorization())
                    .json(&json!({ "content": content })),
            )
            .await?;
        Ok(())
    }

    pub async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        self.request_empty(
            "message pin",
            self.http
                .put(format!(
                    "{}/channels/{channel_id}/pins/{message_id}",
                    self.api_base
                ))
                .header("authorization", self.authorization()),
        )
        .await
    }

    async fn request_json<T>(&self, operation: &str, builder: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .with_context(|| format!("discord api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "discord api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode discord {operation} response"))
    }

    async fn request_empty(&self, operation: &str, builder: reqwest::RequestBuilder) -> Result<()> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("discord api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "discord api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        Ok(())
    }
}

pub(crate) fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let truncated: String = body.chars().take(max_chars).collect();
    format!("{truncated}…")
}
