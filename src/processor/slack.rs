use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::{ModerationError, Result};
use crate::secrets::SecretBundle;
use crate::types::*;

/// The Slack Web API methods the moderation workflows use.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn get_permalink(&self, channel: &str, message_ts: &str) -> Result<String>;

    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<()>;

    async fn post_message(&self, message: &PostMessage) -> Result<PostedMessage>;

    async fn update_message(&self, update: &UpdateMessage) -> Result<()>;

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<()>;

    /// `conversations.history` bounded above by `latest`, inclusive.
    async fn history(&self, channel: &str, latest: &str, limit: u32) -> Result<Vec<Message>>;

    /// `conversations.replies` for the thread rooted at `thread_ts`, every page
    /// of it. The root comes first, as Slack returns it.
    async fn replies(
        &self,
        channel: &str,
        thread_ts: &str,
        bounds: Option<&str>,
    ) -> Result<Vec<Message>>;

    /// Opens (or reuses) a direct message channel with `user` and returns its id.
    async fn open_direct_message(&self, user: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PermalinkBody {
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct PostedBody {
    channel: String,
    ts: String,
}

#[derive(Debug, Deserialize)]
struct MessagesBody {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

impl MessagesBody {
    fn next_cursor(&self) -> Option<&str> {
        self.response_metadata
            .as_ref()
            .map(|meta| meta.next_cursor.as_str())
            .filter(|cursor| !cursor.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ChannelRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ConversationBody {
    channel: ChannelRef,
}

#[derive(Debug, Deserialize)]
struct Empty {}

pub struct SlackClient {
    client: Client,
    api_base: String,
    token: String,
}

impl SlackClient {
    pub fn new(api_base: &str, token: String) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Write methods take a JSON body.
    async fn post_json<B, T>(&self, method: &'static str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method, "slack call");
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::read(method, response).await
    }

    /// Read methods only accept form-encoded arguments.
    async fn post_form<T>(&self, method: &'static str, form: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!(method, "slack call");
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await?;
        Self::read(method, response).await
    }

    async fn read<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModerationError::api(
                method,
                format!("HTTP {status}: {error_text}"),
            ));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ModerationError::api(method, format!("unreadable response: {e}")))?;
        if !envelope.ok {
            return Err(ModerationError::api(
                method,
                envelope.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        envelope
            .body
            .ok_or_else(|| ModerationError::api(method, "response is missing expected fields"))
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn get_permalink(&self, channel: &str, message_ts: &str) -> Result<String> {
        let body: PermalinkBody = self
            .post_form(
                "chat.getPermalink",
                &[("channel", channel), ("message_ts", message_ts)],
            )
            .await?;
        Ok(body.permalink)
    }

    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<()> {
        let _: Empty = self
            .post_json(
                "dialog.open",
                &json!({ "trigger_id": trigger_id, "dialog": dialog }),
            )
            .await?;
        Ok(())
    }

    async fn post_message(&self, message: &PostMessage) -> Result<PostedMessage> {
        let body: PostedBody = self.post_json("chat.postMessage", message).await?;
        Ok(PostedMessage {
            channel: body.channel,
            ts: body.ts,
        })
    }

    async fn update_message(&self, update: &UpdateMessage) -> Result<()> {
        let _: Empty = self.post_json("chat.update", update).await?;
        Ok(())
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<()> {
        let _: Empty = self
            .post_json("chat.delete", &json!({ "channel": channel, "ts": ts }))
            .await?;
        Ok(())
    }

    async fn history(&self, channel: &str, latest: &str, limit: u32) -> Result<Vec<Message>> {
        let limit = limit.to_string();
        let body: MessagesBody = self
            .post_form(
                "conversations.history",
                &[
                    ("channel", channel),
                    ("latest", latest),
                    ("inclusive", "true"),
                    ("limit", limit.as_str()),
                ],
            )
            .await?;
        Ok(body.messages)
    }

    async fn replies(
        &self,
        channel: &str,
        thread_ts: &str,
        bounds: Option<&str>,
    ) -> Result<Vec<Message>> {
        let mut base = vec![("channel", channel), ("ts", thread_ts)];
        if let Some(ts) = bounds {
            base.extend([("oldest", ts), ("latest", ts), ("inclusive", "true")]);
        }

        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut form = base.clone();
            if let Some(cursor) = cursor.as_deref() {
                form.push(("cursor", cursor));
            }
            let body: MessagesBody = self.post_form("conversations.replies", &form).await?;
            let next = body.next_cursor().map(str::to_string);
            messages.extend(body.messages);
            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(messages),
            }
        }
    }

    async fn open_direct_message(&self, user: &str) -> Result<String> {
        let body: ConversationBody = self
            .post_json("conversations.open", &json!({ "users": user }))
            .await?;
        Ok(body.channel.id)
    }
}

/// The two API handles the workflows share: `bot` posts and opens dialogs,
/// `user` reads the moderator channel and edits other people's messages.
#[derive(Clone)]
pub struct SlackClients {
    pub bot: Arc<dyn SlackApi>,
    pub user: Arc<dyn SlackApi>,
}

impl SlackClients {
    /// Single-token workspaces have no user token; the bot token then serves both.
    pub fn from_bundle(config: &Config, bundle: &SecretBundle) -> Result<Self> {
        let bot_token = bundle.get(&config.bot_token_key).ok_or_else(|| {
            ModerationError::Config(format!(
                "secret {} has no {}",
                config.secret_id, config.bot_token_key
            ))
        })?;
        let bot: Arc<dyn SlackApi> =
            Arc::new(SlackClient::new(&config.slack_api_base, bot_token.to_string()));
        let user: Arc<dyn SlackApi> = match bundle.get(&config.user_token_key) {
            Some(user_token) => Arc::new(SlackClient::new(
                &config.slack_api_base,
                user_token.to_string(),
            )),
            None => bot.clone(),
        };
        Ok(Self { bot, user })
    }
}
