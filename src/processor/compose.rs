//! Builders for the dialogs and messages the workflows send.

use serde_json::Value;

use crate::config::CallbackIds;
use crate::types::*;
use crate::workflow::{ActionKind, ModerationKind};

const DO_NOT_ALTER: &str = "Do not alter this value.";

fn ts_value(ts: Option<&str>) -> Option<Value> {
    ts.map(|ts| Value::String(ts.to_string()))
}

fn textarea(name: &str, label: &str, hint: &str, placeholder: &str) -> DialogElement {
    DialogElement {
        label: label.to_string(),
        name: name.to_string(),
        element_type: "textarea".to_string(),
        hint: Some(hint.to_string()),
        placeholder: Some(placeholder.to_string()),
        ..Default::default()
    }
}

fn fixed_text(name: &str, label: &str, value: &str) -> DialogElement {
    DialogElement {
        label: label.to_string(),
        name: name.to_string(),
        element_type: "text".to_string(),
        hint: Some(DO_NOT_ALTER.to_string()),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

pub fn report_dialog(ids: &CallbackIds, permalink: &str) -> Dialog {
    Dialog {
        callback_id: ids.report_message_submit.clone(),
        title: "Report Message".to_string(),
        submit_label: "Send".to_string(),
        elements: vec![
            textarea(
                "reason",
                "Reason",
                "This will be posted to the moderators.",
                "Why is this message being reported?",
            ),
            fixed_text("permalink", "Permalink", permalink),
        ],
    }
}

pub fn moderator_dialog(
    ids: &CallbackIds,
    kind: ActionKind,
    permalink: &str,
    report_ts: &str,
) -> Dialog {
    let choices = kind.choices();
    let action = DialogElement {
        label: "Action".to_string(),
        name: "type".to_string(),
        element_type: "select".to_string(),
        hint: Some("Choose moderator action...".to_string()),
        value: Some(choices[0].as_str().to_string()),
        options: choices
            .iter()
            .map(|choice| DialogOption {
                label: choice.label().to_string(),
                value: choice.as_str().to_string(),
            })
            .collect(),
        ..Default::default()
    };

    Dialog {
        callback_id: ids.moderator_submit.clone(),
        title: "Moderator Action".to_string(),
        submit_label: "Send".to_string(),
        elements: vec![
            action,
            textarea(
                "message",
                "Message",
                "Explain why the moderators are taking action.",
                "Moderator's message...",
            ),
            fixed_text("permalink", "Permalink", permalink),
            fixed_text("report_ts", "Report Timestamp", report_ts),
        ],
    }
}

/// The reporter's reason, as shown to moderators and in the receipt.
pub fn reason_attachment(reporter: &str, reason: &str, action_ts: Option<&str>) -> Attachment {
    Attachment {
        color: Some("warning".to_string()),
        footer: Some(format!("Reported by <@{reporter}>")),
        text: Some(reason.to_string()),
        ts: ts_value(action_ts),
        ..Default::default()
    }
}

/// An excerpt of the reported message linking back to it.
pub fn excerpt_attachment(permalink: &str, link_text: &str, message: &Message) -> Attachment {
    let channel = message.channel.as_deref().unwrap_or_default();
    let author = message.user.as_deref().unwrap_or("unknown");
    Attachment {
        color: Some("danger".to_string()),
        footer: Some(format!("Posted in <#{channel}> by <@{author}>")),
        mrkdwn_in: vec!["text".to_string()],
        text: Some(format!("<{permalink}|{link_text}>\n{}", message.text)),
        ts: ts_value(Some(&message.ts)),
        ..Default::default()
    }
}

pub fn moderator_report(
    ids: &CallbackIds,
    moderator_channel: &str,
    reporter: &str,
    reason: &str,
    action_ts: Option<&str>,
    permalink: &str,
    reported: &Message,
) -> PostMessage {
    let mut excerpt = excerpt_attachment(permalink, "*Permalink*", reported);
    excerpt.callback_id = Some(ids.moderator_action.clone());
    excerpt.actions = vec![
        AttachmentAction::button(ActionKind::Warn.button_name(), "Send Warning", permalink),
        AttachmentAction::button(ActionKind::Remove.button_name(), "Remove Message", permalink)
            .styled("danger"),
    ];

    PostMessage {
        channel: moderator_channel.to_string(),
        text: "A message has been reported.".to_string(),
        attachments: vec![reason_attachment(reporter, reason, action_ts), excerpt],
        thread_ts: None,
    }
}

pub fn report_receipt(
    dm_channel: &str,
    reporter: &str,
    reason: &str,
    action_ts: Option<&str>,
) -> PostMessage {
    PostMessage {
        channel: dm_channel.to_string(),
        text: "We have received your report.".to_string(),
        attachments: vec![reason_attachment(reporter, reason, action_ts)],
        thread_ts: None,
    }
}

/// Text that replaces each message of a removed thread.
pub fn redaction_text(moderator_message: &str) -> String {
    if moderator_message.trim().is_empty() {
        "_This message was removed by a moderator._".to_string()
    } else {
        format!("_{}_", moderator_message.trim())
    }
}

pub fn audit_footer(kind: ModerationKind, moderator: &str, channel: &str) -> String {
    match kind {
        ModerationKind::PrivateDm => format!("<@{moderator}> warned user in DM"),
        ModerationKind::PostInThread => format!("<@{moderator}> warned user in <#{channel}>"),
        ModerationKind::RemoveMessage => format!("<@{moderator}> removed message in <#{channel}>"),
        ModerationKind::RemoveThread => format!("<@{moderator}> removed thread in <#{channel}>"),
    }
}

pub fn audit_addendum(footer: String, moderator_message: &str, action_ts: Option<&str>) -> Attachment {
    Attachment {
        color: Some("warning".to_string()),
        footer: Some(footer),
        text: Some(moderator_message.to_string()),
        ts: ts_value(action_ts),
        ..Default::default()
    }
}

/// Republishes a report with one more attachment. Once content is gone the
/// report's buttons are stripped so nobody acts on it twice.
pub fn append_audit(
    report: Message,
    channel: &str,
    addendum: Attachment,
    strip_actions: bool,
) -> UpdateMessage {
    let mut attachments = report.attachments;
    if strip_actions {
        for attachment in &mut attachments {
            attachment.actions.clear();
        }
    }
    attachments.push(addendum);

    UpdateMessage {
        channel: channel.to_string(),
        ts: report.ts,
        text: report.text,
        attachments,
    }
}
