use crate::error::{ModerationError, Result};

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Callback identifiers the bot stamps on its dialogs and attachments, and
/// routes on when they come back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackIds {
    pub report_message_action: String,
    pub report_message_submit: String,
    pub moderator_action: String,
    pub moderator_submit: String,
}

impl Default for CallbackIds {
    fn default() -> Self {
        Self {
            report_message_action: "report_message_action".to_string(),
            report_message_submit: "report_message_submit".to_string(),
            moderator_action: "moderator_action".to_string(),
            moderator_submit: "moderator_submit".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub moderator_channel: String,
    pub secret_id: String,
    pub bot_token_key: String,
    pub user_token_key: String,
    pub slack_api_base: String,
    pub callback_ids: CallbackIds,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| ModerationError::Config(format!("{key} is not set")))
        };

        let defaults = CallbackIds::default();
        let callback_ids = CallbackIds {
            report_message_action: get("REPORT_MESSAGE_ACTION")
                .unwrap_or(defaults.report_message_action),
            report_message_submit: get("REPORT_MESSAGE_SUBMIT")
                .unwrap_or(defaults.report_message_submit),
            moderator_action: get("MODERATOR_ACTION").unwrap_or(defaults.moderator_action),
            moderator_submit: get("MODERATOR_SUBMIT").unwrap_or(defaults.moderator_submit),
        };

        Ok(Self {
            moderator_channel: require("MODERATOR_CHANNEL")?,
            // Older deployments named the secret variable AWS_SECRET.
            secret_id: get("SECRET")
                .or_else(|| get("AWS_SECRET"))
                .ok_or_else(|| ModerationError::Config("SECRET is not set".to_string()))?,
            bot_token_key: get("BOT_TOKEN_KEY").unwrap_or_else(|| "BOT_ACCESS_TOKEN".to_string()),
            user_token_key: get("USER_TOKEN_KEY")
                .unwrap_or_else(|| "USER_ACCESS_TOKEN".to_string()),
            slack_api_base: get("SLACK_API_BASE")
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),
            callback_ids,
        })
    }
}
