use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::handlers;
use crate::slack::SlackClients;
use crate::workflow::{ModerationKind, WorkflowStep};

/// Everything a handler needs for one invocation.
pub struct Workflow<'a> {
    pub config: &'a Config,
    pub slack: &'a SlackClients,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    DialogOpened,
    ReportPosted { report_ts: String },
    ModerationApplied { kind: ModerationKind, messages: usize },
}

pub async fn dispatch(wf: &Workflow<'_>, step: WorkflowStep) -> Result<Outcome> {
    info!(step = step.name(), "dispatching");
    match step {
        WorkflowStep::ReportMessageAction(step) => handlers::report_message_action(wf, step).await,
        WorkflowStep::ReportMessageSubmit(step) => handlers::report_message_submit(wf, step).await,
        WorkflowStep::ModeratorAction(step) => handlers::moderator_action(wf, step).await,
        WorkflowStep::ModeratorSubmit(step) => handlers::moderator_submit(wf, step).await,
    }
}

/// Parses one decoded payload and runs the workflow step it names.
pub async fn handle_payload(wf: &Workflow<'_>, payload: Value) -> Result<Outcome> {
    let step = WorkflowStep::parse(payload, &wf.config.callback_ids)?;
    dispatch(wf, step).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::compose;
    use crate::config::CallbackIds;
    use crate::error::ModerationError;
    use crate::testing::{clients, message, reply, Call, RecordingSlack};
    use crate::types::*;

    const CHANNEL: &str = "C024BE91L";
    const MODERATORS: &str = "GMODS";
    const MESSAGE_TS: &str = "1536266444.000100";
    const REPORT_TS: &str = "1600000000.000001";
    const LINK: &str = "https://acme.slack.com/archives/C024BE91L/p1536266444000100";

    fn config() -> Config {
        Config {
            moderator_channel: MODERATORS.to_string(),
            secret_id: "slack/moderation".to_string(),
            bot_token_key: "BOT_ACCESS_TOKEN".to_string(),
            user_token_key: "USER_ACCESS_TOKEN".to_string(),
            slack_api_base: "http://localhost".to_string(),
            callback_ids: CallbackIds::default(),
        }
    }

    /// A report as `report_message_submit` leaves it in the moderator channel.
    fn report() -> Message {
        let reported = Message {
            channel: Some(CHANNEL.to_string()),
            ..message(MESSAGE_TS, "UAUTHOR", "offending text")
        };
        let post = compose::moderator_report(
            &CallbackIds::default(),
            MODERATORS,
            "UREPORTER",
            "spam",
            Some("1599999999.000000"),
            LINK,
            &reported,
        );
        Message {
            ts: REPORT_TS.to_string(),
            text: post.text,
            attachments: post.attachments,
            ..Default::default()
        }
    }

    fn submit(kind: &str, message: &str, permalink: &str) -> Value {
        json!({
            "type": "dialog_submission",
            "callback_id": "moderator_submit",
            "action_ts": "1600000100.000000",
            "user": {"id": "UMOD"},
            "submission": {
                "type": kind,
                "message": message,
                "permalink": permalink,
                "report_ts": REPORT_TS
            }
        })
    }

    async fn run(slack: &Arc<RecordingSlack>, payload: Value) -> Result<Outcome> {
        let config = config();
        let slack = clients(slack);
        let wf = Workflow {
            config: &config,
            slack: &slack,
        };
        handle_payload(&wf, payload).await
    }

    fn updates(slack: &RecordingSlack) -> Vec<UpdateMessage> {
        slack
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn report_action_opens_report_dialog_with_permalink() {
        let slack = Arc::new(RecordingSlack::new().with_permalink(LINK));
        let outcome = run(
            &slack,
            json!({
                "type": "message_action",
                "callback_id": "report_message_action",
                "trigger_id": "trigger-1",
                "channel": {"id": CHANNEL},
                "user": {"id": "UREPORTER"},
                "message": {"ts": MESSAGE_TS, "text": "offending text"}
            }),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::DialogOpened);
        let calls = slack.calls();
        assert_eq!(
            calls[0],
            Call::GetPermalink {
                channel: CHANNEL.to_string(),
                ts: MESSAGE_TS.to_string(),
            }
        );
        match &calls[1] {
            Call::OpenDialog { trigger_id, dialog } => {
                assert_eq!(trigger_id, "trigger-1");
                assert_eq!(dialog.title, "Report Message");
                assert_eq!(dialog.elements[0].name, "reason");
                assert_eq!(dialog.elements[0].element_type, "textarea");
                assert_eq!(dialog.elements[1].name, "permalink");
                assert_eq!(dialog.elements[1].value.as_deref(), Some(LINK));
            }
            other => panic!("expected dialog.open, got {other:?}"),
        }
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn report_submit_alerts_moderators_then_sends_receipt() {
        let slack = Arc::new(RecordingSlack::new().with_history(
            CHANNEL,
            MESSAGE_TS,
            vec![message(MESSAGE_TS, "UAUTHOR", "offending text")],
        ));
        let outcome = run(
            &slack,
            json!({
                "type": "dialog_submission",
                "callback_id": "report_message_submit",
                "action_ts": "1599999999.000000",
                "user": {"id": "UREPORTER"},
                "submission": {"reason": "spam", "permalink": LINK}
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            slack.methods(),
            vec![
                "conversations.history",
                "chat.postMessage",
                "conversations.open",
                "chat.postMessage"
            ]
        );
        let posts: Vec<PostMessage> = slack
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Post(post) => Some(post),
                _ => None,
            })
            .collect();
        assert_eq!(posts[0].channel, MODERATORS);
        assert_eq!(posts[0].attachments[1].actions.len(), 2);
        assert_eq!(posts[1].channel, "DUREPORTER");
        assert_eq!(posts[1].text, "We have received your report.");
        assert_eq!(
            outcome,
            Outcome::ReportPosted {
                report_ts: "1900000000.000001".to_string()
            }
        );
    }

    #[tokio::test]
    async fn moderator_button_opens_prefilled_dialog() {
        let slack = Arc::new(RecordingSlack::new());
        run(
            &slack,
            json!({
                "type": "interactive_message",
                "callback_id": "moderator_action",
                "trigger_id": "trigger-2",
                "actions": [{"name": "remove_action", "type": "button", "value": LINK}],
                "original_message": {"ts": REPORT_TS}
            }),
        )
        .await
        .unwrap();

        match &slack.calls()[..] {
            [Call::OpenDialog { dialog, .. }] => {
                assert_eq!(dialog.title, "Moderator Action");
                assert_eq!(dialog.elements[0].value.as_deref(), Some("remove_message"));
                assert_eq!(dialog.elements[2].value.as_deref(), Some(LINK));
                assert_eq!(dialog.elements[3].value.as_deref(), Some(REPORT_TS));
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[tokio::test]
    async fn private_dm_warns_author_and_appends_audit() {
        let slack = Arc::new(
            RecordingSlack::new()
                .with_history(
                    CHANNEL,
                    MESSAGE_TS,
                    vec![message(MESSAGE_TS, "UAUTHOR", "offending text")],
                )
                .with_history(MODERATORS, REPORT_TS, vec![report()]),
        );
        let outcome = run(&slack, submit("private_dm", "Please keep it civil.", LINK))
            .await
            .unwrap();

        assert_eq!(
            slack.methods(),
            vec![
                "conversations.history",
                "conversations.open",
                "chat.postMessage",
                "conversations.history",
                "chat.update"
            ]
        );
        assert!(slack.calls().contains(&Call::OpenDm {
            user: "UAUTHOR".to_string()
        }));

        let update = &updates(&slack)[0];
        let prior = report().attachments;
        assert_eq!(update.ts, REPORT_TS);
        assert_eq!(update.attachments.len(), prior.len() + 1);
        assert_eq!(update.attachments[..prior.len()], prior[..]);
        let addendum = update.attachments.last().unwrap();
        assert_eq!(addendum.footer.as_deref(), Some("<@UMOD> warned user in DM"));
        assert_eq!(addendum.text.as_deref(), Some("Please keep it civil."));
        assert_eq!(
            outcome,
            Outcome::ModerationApplied {
                kind: ModerationKind::PrivateDm,
                messages: 1
            }
        );
    }

    #[tokio::test]
    async fn post_in_thread_replies_under_thread_root() {
        let reply_link = "https://acme.slack.com/archives/C024BE91L/p1536266500000200?thread_ts=1536266444.000100&cid=C024BE91L";
        let slack = Arc::new(
            RecordingSlack::new()
                .with_thread(
                    CHANNEL,
                    MESSAGE_TS,
                    vec![
                        message(MESSAGE_TS, "UROOT", "root"),
                        reply("1536266500.000200", MESSAGE_TS, "UAUTHOR", "offending reply"),
                    ],
                )
                .with_history(MODERATORS, REPORT_TS, vec![report()]),
        );
        run(&slack, submit("post_in_thread", "Keep it civil.", reply_link))
            .await
            .unwrap();

        let posted = slack
            .calls()
            .into_iter()
            .find_map(|call| match call {
                Call::Post(post) => Some(post),
                _ => None,
            })
            .unwrap();
        assert_eq!(posted.channel, CHANNEL);
        assert_eq!(posted.thread_ts.as_deref(), Some(MESSAGE_TS));
        let footer = updates(&slack)[0].attachments.last().unwrap().footer.clone();
        assert_eq!(footer.as_deref(), Some("<@UMOD> warned user in <#C024BE91L>"));
    }

    #[tokio::test]
    async fn remove_message_deletes_once_then_strips_buttons() {
        let slack = Arc::new(
            RecordingSlack::new()
                .with_history(
                    CHANNEL,
                    MESSAGE_TS,
                    vec![message(MESSAGE_TS, "UAUTHOR", "offending text")],
                )
                .with_history(MODERATORS, REPORT_TS, vec![report()]),
        );
        let outcome = run(&slack, submit("remove_message", "Spam", LINK)).await.unwrap();

        let calls = slack.calls();
        let deletes: Vec<&Call> = calls
            .iter()
            .filter(|call| matches!(call, Call::Delete { .. }))
            .collect();
        assert_eq!(
            deletes,
            vec![&Call::Delete {
                channel: CHANNEL.to_string(),
                ts: MESSAGE_TS.to_string(),
            }]
        );
        assert_eq!(
            slack.methods(),
            vec![
                "conversations.history",
                "chat.delete",
                "conversations.history",
                "chat.update"
            ]
        );

        let update = &updates(&slack)[0];
        assert_eq!(update.channel, MODERATORS);
        assert_eq!(update.attachments.len(), report().attachments.len() + 1);
        assert!(update.attachments.iter().all(|a| a.actions.is_empty()));
        assert_eq!(
            outcome,
            Outcome::ModerationApplied {
                kind: ModerationKind::RemoveMessage,
                messages: 1
            }
        );
    }

    #[tokio::test]
    async fn remove_thread_redacts_each_message_once_root_last() {
        let slack = Arc::new(
            RecordingSlack::new()
                .with_history(
                    CHANNEL,
                    MESSAGE_TS,
                    vec![message(MESSAGE_TS, "UROOT", "root")],
                )
                .with_thread(
                    CHANNEL,
                    MESSAGE_TS,
                    vec![
                        message(MESSAGE_TS, "UROOT", "root"),
                        reply("1536266450.000001", MESSAGE_TS, "U2", "one"),
                        reply("1536266460.000002", MESSAGE_TS, "U3", "two"),
                        reply("1536266470.000003", MESSAGE_TS, "U4", "three"),
                    ],
                )
                .with_history(MODERATORS, REPORT_TS, vec![report()]),
        );
        let outcome = run(&slack, submit("remove_thread", "Thread removed", LINK))
            .await
            .unwrap();

        let updates = updates(&slack);
        let (audit, redactions) = updates.split_last().unwrap();
        let redacted: Vec<&str> = redactions.iter().map(|u| u.ts.as_str()).collect();
        assert_eq!(
            redacted,
            vec![
                "1536266470.000003",
                "1536266460.000002",
                "1536266450.000001",
                MESSAGE_TS
            ]
        );
        assert!(redactions
            .iter()
            .all(|u| u.channel == CHANNEL && u.text == "_Thread removed_"));
        assert_eq!(audit.channel, MODERATORS);
        assert!(audit.attachments.iter().all(|a| a.actions.is_empty()));
        assert!(!slack.methods().contains(&"chat.delete"));
        assert_eq!(
            outcome,
            Outcome::ModerationApplied {
                kind: ModerationKind::RemoveThread,
                messages: 4
            }
        );
    }

    #[tokio::test]
    async fn failed_call_short_circuits_remaining_steps() {
        let slack = Arc::new(
            RecordingSlack::new()
                .with_history(
                    CHANNEL,
                    MESSAGE_TS,
                    vec![message(MESSAGE_TS, "UAUTHOR", "offending text")],
                )
                .failing_on("chat.delete"),
        );
        let err = run(&slack, submit("remove_message", "Spam", LINK))
            .await
            .unwrap_err();

        assert!(matches!(err, ModerationError::ApiCall { method: "chat.delete", .. }));
        assert_eq!(slack.methods(), vec!["conversations.history", "chat.delete"]);
    }

    #[tokio::test]
    async fn missing_report_fails_after_the_action() {
        let slack = Arc::new(RecordingSlack::new().with_history(
            CHANNEL,
            MESSAGE_TS,
            vec![message(MESSAGE_TS, "UAUTHOR", "offending text")],
        ));
        let err = run(&slack, submit("remove_message", "Spam", LINK))
            .await
            .unwrap_err();

        assert!(matches!(err, ModerationError::MessageNotFound(_)));
        assert!(slack.methods().contains(&"chat.delete"));
        assert!(!slack.methods().contains(&"chat.update"));
    }

    #[tokio::test]
    async fn unknown_callback_makes_no_calls() {
        let slack = Arc::new(RecordingSlack::new());
        let err = run(&slack, json!({"callback_id": "submit_report"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::UnknownWorkflow(_)));
        assert!(slack.calls().is_empty());
    }
}
