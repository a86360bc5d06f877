use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ModerationError, Result};
use crate::slack::SlackApi;
use crate::types::Message;

static PERMALINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://[^/]+\.slack\.com/archives/([^/]+)/p(\d{10})(\d{6})")
        .expect("permalink pattern is valid")
});

static THREAD_TS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"thread_ts=(\d{10}\.\d{6})").expect("thread_ts pattern is valid"));

/// A message permalink taken apart: `.../archives/<channel>/p<ts without dot>`,
/// with `?thread_ts=<root>` when the message is a thread reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permalink {
    pub url: String,
    pub channel: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

impl Permalink {
    pub fn parse(url: &str) -> Result<Self> {
        let captures = PERMALINK
            .captures(url)
            .ok_or_else(|| ModerationError::MessageNotFound(format!("not a permalink: {url}")))?;

        let thread_ts = if url.contains("thread_ts=") {
            let root = THREAD_TS.captures(url).ok_or_else(|| {
                ModerationError::MessageNotFound(format!("malformed thread_ts in {url}"))
            })?;
            Some(root[1].to_string())
        } else {
            None
        };

        Ok(Self {
            url: url.to_string(),
            channel: captures[1].to_string(),
            ts: format!("{}.{}", &captures[2], &captures[3]),
            thread_ts,
        })
    }
}

/// Fetches the message a permalink points at. Thread replies are looked up in
/// their thread; everything else in channel history.
pub async fn resolve(api: &dyn SlackApi, permalink: &Permalink) -> Result<Message> {
    let channel = permalink.channel.as_str();
    let ts = permalink.ts.as_str();

    let found = match &permalink.thread_ts {
        Some(thread_ts) => {
            debug!(channel, thread_ts = %thread_ts, ts, "looking up thread reply");
            api.replies(channel, thread_ts, Some(ts))
                .await?
                .into_iter()
                .find(|message| message.ts == ts)
        }
        None => {
            debug!(channel, ts, "looking up channel history");
            api.history(channel, ts, 1).await?.into_iter().next()
        }
    };

    // History is bounded by `latest`, so a deleted message yields an older one.
    match found {
        Some(mut message) if message.ts == ts => {
            message.channel = Some(permalink.channel.clone());
            Ok(message)
        }
        _ => Err(ModerationError::MessageNotFound(permalink.url.clone())),
    }
}
