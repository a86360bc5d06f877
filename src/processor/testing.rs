//! In-memory `SlackApi` that records every call, for workflow tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ModerationError, Result};
use crate::slack::{SlackApi, SlackClients};
use crate::types::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetPermalink { channel: String, ts: String },
    OpenDialog { trigger_id: String, dialog: Dialog },
    Post(PostMessage),
    Update(UpdateMessage),
    Delete { channel: String, ts: String },
    History { channel: String, latest: String },
    Replies { channel: String, thread_ts: String },
    OpenDm { user: String },
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Call::GetPermalink { .. } => "chat.getPermalink",
            Call::OpenDialog { .. } => "dialog.open",
            Call::Post(_) => "chat.postMessage",
            Call::Update(_) => "chat.update",
            Call::Delete { .. } => "chat.delete",
            Call::History { .. } => "conversations.history",
            Call::Replies { .. } => "conversations.replies",
            Call::OpenDm { .. } => "conversations.open",
        }
    }
}

#[derive(Default)]
pub struct RecordingSlack {
    calls: Mutex<Vec<Call>>,
    history: HashMap<(String, String), Vec<Message>>,
    threads: HashMap<(String, String), Vec<Message>>,
    permalink: Option<String>,
    failing: Option<&'static str>,
    posted: AtomicUsize,
}

impl RecordingSlack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permalink(mut self, permalink: &str) -> Self {
        self.permalink = Some(permalink.to_string());
        self
    }

    /// Messages returned by `conversations.history` for `(channel, latest)`.
    pub fn with_history(mut self, channel: &str, latest: &str, messages: Vec<Message>) -> Self {
        self.history
            .insert((channel.to_string(), latest.to_string()), messages);
        self
    }

    /// Whole thread, root first, returned by `conversations.replies`.
    pub fn with_thread(mut self, channel: &str, root_ts: &str, messages: Vec<Message>) -> Self {
        self.threads
            .insert((channel.to_string(), root_ts.to_string()), messages);
        self
    }

    pub fn failing_on(mut self, method: &'static str) -> Self {
        self.failing = Some(method);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::method).collect()
    }

    fn record(&self, call: Call) -> Result<()> {
        let method = call.method();
        self.calls.lock().unwrap().push(call);
        match self.failing {
            Some(failing) if failing == method => Err(ModerationError::api(method, "fake_failure")),
            _ => Ok(()),
        }
    }
}

pub fn clients(slack: &Arc<RecordingSlack>) -> SlackClients {
    SlackClients {
        bot: slack.clone(),
        user: slack.clone(),
    }
}

pub fn message(ts: &str, user: &str, text: &str) -> Message {
    Message {
        ts: ts.to_string(),
        user: Some(user.to_string()),
        text: text.to_string(),
        ..Default::default()
    }
}

pub fn reply(ts: &str, thread_ts: &str, user: &str, text: &str) -> Message {
    Message {
        thread_ts: Some(thread_ts.to_string()),
        ..message(ts, user, text)
    }
}

#[async_trait]
impl SlackApi for RecordingSlack {
    async fn get_permalink(&self, channel: &str, message_ts: &str) -> Result<String> {
        self.record(Call::GetPermalink {
            channel: channel.to_string(),
            ts: message_ts.to_string(),
        })?;
        Ok(self.permalink.clone().unwrap_or_else(|| {
            format!(
                "https://acme.slack.com/archives/{}/p{}",
                channel,
                message_ts.replace('.', "")
            )
        }))
    }

    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<()> {
        self.record(Call::OpenDialog {
            trigger_id: trigger_id.to_string(),
            dialog: dialog.clone(),
        })
    }

    async fn post_message(&self, message: &PostMessage) -> Result<PostedMessage> {
        self.record(Call::Post(message.clone()))?;
        let n = self.posted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PostedMessage {
            channel: message.channel.clone(),
            ts: format!("1900000000.{n:06}"),
        })
    }

    async fn update_message(&self, update: &UpdateMessage) -> Result<()> {
        self.record(Call::Update(update.clone()))
    }

    async fn delete_message(&self, channel: &str, ts: &str) -> Result<()> {
        self.record(Call::Delete {
            channel: channel.to_string(),
            ts: ts.to_string(),
        })
    }

    async fn history(&self, channel: &str, latest: &str, _limit: u32) -> Result<Vec<Message>> {
        self.record(Call::History {
            channel: channel.to_string(),
            latest: latest.to_string(),
        })?;
        Ok(self
            .history
            .get(&(channel.to_string(), latest.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn replies(
        &self,
        channel: &str,
        thread_ts: &str,
        bounds: Option<&str>,
    ) -> Result<Vec<Message>> {
        self.record(Call::Replies {
            channel: channel.to_string(),
            thread_ts: thread_ts.to_string(),
        })?;
        let thread = self
            .threads
            .get(&(channel.to_string(), thread_ts.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(match bounds {
            // Slack always leads with the root, whatever the bounds.
            Some(ts) => thread
                .into_iter()
                .enumerate()
                .filter(|(i, m)| *i == 0 || m.ts == ts)
                .map(|(_, m)| m)
                .collect(),
            None => thread,
        })
    }

    async fn open_direct_message(&self, user: &str) -> Result<String> {
        self.record(Call::OpenDm {
            user: user.to_string(),
        })?;
        Ok(format!("D{user}"))
    }
}
