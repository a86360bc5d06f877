//! Slack interactive payloads parsed into the workflow step they represent.

use serde::Deserialize;
use serde_json::Value;

use crate::config::CallbackIds;
use crate::envelope::EnvelopeError;
use crate::error::{ModerationError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStep {
    /// "Report message" shortcut used on a message.
    ReportMessageAction(ReportMessageAction),
    /// The report dialog was submitted.
    ReportMessageSubmit(ReportMessageSubmit),
    /// A moderator clicked a button on a report.
    ModeratorAction(ModeratorAction),
    /// The moderator action dialog was submitted.
    ModeratorSubmit(ModeratorSubmit),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMessageAction {
    pub channel: String,
    pub message_ts: String,
    pub trigger_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMessageSubmit {
    pub reporter: String,
    pub reason: String,
    pub permalink: String,
    pub action_ts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorAction {
    pub kind: ActionKind,
    pub permalink: String,
    pub report_ts: String,
    pub trigger_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorSubmit {
    pub kind: ModerationKind,
    pub moderator: String,
    pub message: String,
    pub permalink: String,
    pub report_ts: String,
    pub action_ts: Option<String>,
}

/// Buttons on a moderator report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Warn,
    Remove,
}

impl ActionKind {
    pub const WARN: &'static str = "warn_action";
    pub const REMOVE: &'static str = "remove_action";

    pub fn button_name(self) -> &'static str {
        match self {
            ActionKind::Warn => Self::WARN,
            ActionKind::Remove => Self::REMOVE,
        }
    }

    /// Choices offered in the moderator dialog, the first being preselected.
    pub fn choices(self) -> [ModerationKind; 2] {
        match self {
            ActionKind::Warn => [ModerationKind::PrivateDm, ModerationKind::PostInThread],
            ActionKind::Remove => [ModerationKind::RemoveMessage, ModerationKind::RemoveThread],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationKind {
    PrivateDm,
    PostInThread,
    RemoveMessage,
    RemoveThread,
}

impl ModerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationKind::PrivateDm => "private_dm",
            ModerationKind::PostInThread => "post_in_thread",
            ModerationKind::RemoveMessage => "remove_message",
            ModerationKind::RemoveThread => "remove_thread",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModerationKind::PrivateDm => "Warn in Private DM",
            ModerationKind::PostInThread => "Warn in Thread",
            ModerationKind::RemoveMessage => "Remove Message",
            ModerationKind::RemoveThread => "Remove Entire Thread",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [
            ModerationKind::PrivateDm,
            ModerationKind::PostInThread,
            ModerationKind::RemoveMessage,
            ModerationKind::RemoveThread,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == value)
    }

    pub fn removes_content(self) -> bool {
        matches!(
            self,
            ModerationKind::RemoveMessage | ModerationKind::RemoveThread
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct IdRef {
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TsRef {
    ts: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAction {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSubmission {
    reason: Option<String>,
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    permalink: Option<String>,
    report_ts: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    callback_id: Option<String>,
    trigger_id: Option<String>,
    action_ts: Option<String>,
    #[serde(default)]
    channel: IdRef,
    #[serde(default)]
    user: IdRef,
    #[serde(default)]
    message: TsRef,
    #[serde(default)]
    original_message: TsRef,
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default)]
    submission: RawSubmission,
}

impl WorkflowStep {
    pub fn parse(payload: Value, ids: &CallbackIds) -> Result<Self> {
        let raw: RawPayload = serde_json::from_value(payload)
            .map_err(|e| ModerationError::Decode(EnvelopeError::Json(e)))?;
        let callback_id = raw
            .callback_id
            .clone()
            .ok_or_else(|| ModerationError::UnknownWorkflow("<missing callback_id>".to_string()))?;

        let require = |value: Option<String>, field: &'static str| {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ModerationError::InvalidPayload {
                    callback_id: callback_id.clone(),
                    field,
                })
        };

        let step = match callback_id.as_str() {
            id if id == ids.report_message_action => {
                WorkflowStep::ReportMessageAction(ReportMessageAction {
                    channel: require(raw.channel.id, "channel.id")?,
                    message_ts: require(raw.message.ts, "message.ts")?,
                    trigger_id: require(raw.trigger_id, "trigger_id")?,
                })
            }
            id if id == ids.report_message_submit => {
                WorkflowStep::ReportMessageSubmit(ReportMessageSubmit {
                    reporter: require(raw.user.id, "user.id")?,
                    reason: require(raw.submission.reason, "submission.reason")?,
                    permalink: require(raw.submission.permalink, "submission.permalink")?,
                    action_ts: raw.action_ts,
                })
            }
            id if id == ids.moderator_action => {
                let action = raw.actions.into_iter().next().unwrap_or_default();
                let name = require(action.name, "actions[0].name")?;
                let kind = match name.as_str() {
                    ActionKind::WARN => ActionKind::Warn,
                    ActionKind::REMOVE => ActionKind::Remove,
                    other => {
                        return Err(ModerationError::UnknownWorkflow(format!(
                            "{callback_id}/{other}"
                        )))
                    }
                };
                WorkflowStep::ModeratorAction(ModeratorAction {
                    kind,
                    permalink: require(action.value, "actions[0].value")?,
                    report_ts: require(raw.original_message.ts, "original_message.ts")?,
                    trigger_id: require(raw.trigger_id, "trigger_id")?,
                })
            }
            id if id == ids.moderator_submit => {
                let submission = raw.submission;
                let kind_name = require(submission.kind, "submission.type")?;
                let kind = ModerationKind::parse(&kind_name).ok_or_else(|| {
                    ModerationError::UnknownWorkflow(format!("{callback_id}/{kind_name}"))
                })?;
                WorkflowStep::ModeratorSubmit(ModeratorSubmit {
                    kind,
                    moderator: require(raw.user.id, "user.id")?,
                    message: submission.message.unwrap_or_default(),
                    permalink: require(submission.permalink, "submission.permalink")?,
                    report_ts: require(submission.report_ts, "submission.report_ts")?,
                    action_ts: raw.action_ts,
                })
            }
            _ => return Err(ModerationError::UnknownWorkflow(callback_id.clone())),
        };
        Ok(step)
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::ReportMessageAction(_) => "report_message_action",
            WorkflowStep::ReportMessageSubmit(_) => "report_message_submit",
            WorkflowStep::ModeratorAction(action) => match action.kind {
                ActionKind::Warn => "moderator_action/warn",
                ActionKind::Remove => "moderator_action/remove",
            },
            WorkflowStep::ModeratorSubmit(submit) => match submit.kind {
                ModerationKind::PrivateDm => "moderator_submit/private_dm",
                ModerationKind::PostInThread => "moderator_submit/post_in_thread",
                ModerationKind::RemoveMessage => "moderator_submit/remove_message",
                ModerationKind::RemoveThread => "moderator_submit/remove_thread",
            },
        }
    }
}
