use serde::Deserialize;

/// Slack posts interactive payloads as a form with a single JSON field.
#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

/// Just enough of the payload to log what is being forwarded.
#[derive(Debug, Deserialize)]
pub struct InteractionSummary {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub callback_id: Option<String>,
}
