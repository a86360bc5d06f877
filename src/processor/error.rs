use crate::envelope::EnvelopeError;

pub type Result<T, E = ModerationError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to fetch secret {secret_id}: {reason}")]
    SecretFetch { secret_id: String, reason: String },

    #[error("failed to decode event: {0}")]
    Decode(#[from] EnvelopeError),

    #[error("invalid {callback_id} payload: missing {field}")]
    InvalidPayload {
        callback_id: String,
        field: &'static str,
    },

    #[error("unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("message not found: {0}")]
    MessageNotFound(String),

    #[error("slack {method} failed: {reason}")]
    ApiCall { method: &'static str, reason: String },
}

impl ModerationError {
    pub fn api(method: &'static str, reason: impl Into<String>) -> Self {
        Self::ApiCall {
            method,
            reason: reason.into(),
        }
    }
}

impl From<reqwest::Error> for ModerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::api("http", err.to_string())
    }
}
