//! Codec for the SNS message body shared by the receiver and the processor.
//!
//! The receiver publishes each Slack interactive payload as a base64 string of
//! its JSON text; the processor reverses that.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

#[allow(dead_code)]
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid base64 in envelope: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid JSON in envelope: {0}")]
    Json(#[from] serde_json::Error),
}

#[allow(dead_code)]
pub fn encode_payload(payload_json: &str) -> String {
    STANDARD.encode(payload_json.as_bytes())
}

#[allow(dead_code)]
pub fn decode_payload(message: &str) -> Result<Value, EnvelopeError> {
    let bytes = STANDARD.decode(message.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}
