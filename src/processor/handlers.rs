use futures_util::future::try_join_all;
use tracing::info;

use crate::compose;
use crate::dispatch::{Outcome, Workflow};
use crate::error::{ModerationError, Result};
use crate::permalink::{self, Permalink};
use crate::types::*;
use crate::workflow::*;

pub async fn report_message_action(wf: &Workflow<'_>, step: ReportMessageAction) -> Result<Outcome> {
    let permalink = wf
        .slack
        .bot
        .get_permalink(&step.channel, &step.message_ts)
        .await?;
    info!(%permalink, "opening report dialog");

    let dialog = compose::report_dialog(&wf.config.callback_ids, &permalink);
    wf.slack.bot.open_dialog(&step.trigger_id, &dialog).await?;
    Ok(Outcome::DialogOpened)
}

pub async fn report_message_submit(wf: &Workflow<'_>, step: ReportMessageSubmit) -> Result<Outcome> {
    let link = Permalink::parse(&step.permalink)?;
    let reported = permalink::resolve(wf.slack.user.as_ref(), &link).await?;

    let report = compose::moderator_report(
        &wf.config.callback_ids,
        &wf.config.moderator_channel,
        &step.reporter,
        &step.reason,
        step.action_ts.as_deref(),
        &link.url,
        &reported,
    );
    let posted = wf.slack.bot.post_message(&report).await?;
    info!(report_ts = %posted.ts, reporter = %step.reporter, "report posted to moderators");

    let dm = wf.slack.bot.open_direct_message(&step.reporter).await?;
    let receipt = compose::report_receipt(
        &dm,
        &step.reporter,
        &step.reason,
        step.action_ts.as_deref(),
    );
    wf.slack.bot.post_message(&receipt).await?;

    Ok(Outcome::ReportPosted {
        report_ts: posted.ts,
    })
}

pub async fn moderator_action(wf: &Workflow<'_>, step: ModeratorAction) -> Result<Outcome> {
    let dialog = compose::moderator_dialog(
        &wf.config.callback_ids,
        step.kind,
        &step.permalink,
        &step.report_ts,
    );
    wf.slack.bot.open_dialog(&step.trigger_id, &dialog).await?;
    Ok(Outcome::DialogOpened)
}

pub async fn moderator_submit(wf: &Workflow<'_>, step: ModeratorSubmit) -> Result<Outcome> {
    let link = Permalink::parse(&step.permalink)?;
    let reported = permalink::resolve(wf.slack.user.as_ref(), &link).await?;

    let messages = match step.kind {
        ModerationKind::PrivateDm => warn_in_dm(wf, &step, &link, &reported).await?,
        ModerationKind::PostInThread => warn_in_thread(wf, &step, &link, &reported).await?,
        ModerationKind::RemoveMessage => {
            wf.slack
                .user
                .delete_message(&link.channel, &reported.ts)
                .await?;
            1
        }
        ModerationKind::RemoveThread => remove_thread(wf, &step, &link, &reported).await?,
    };
    info!(kind = step.kind.as_str(), messages, channel = %link.channel, "moderation applied");

    append_audit_entry(wf, &step, &link).await?;
    Ok(Outcome::ModerationApplied {
        kind: step.kind,
        messages,
    })
}

async fn warn_in_dm(
    wf: &Workflow<'_>,
    step: &ModeratorSubmit,
    link: &Permalink,
    reported: &Message,
) -> Result<usize> {
    let author = reported
        .user
        .as_deref()
        .ok_or_else(|| ModerationError::MessageNotFound(format!("{} has no author", link.url)))?;
    let dm = wf.slack.bot.open_direct_message(author).await?;

    let warning = PostMessage {
        channel: dm,
        text: step.message.clone(),
        attachments: vec![compose::excerpt_attachment(&link.url, "Permalink", reported)],
        thread_ts: None,
    };
    wf.slack.bot.post_message(&warning).await?;
    Ok(1)
}

async fn warn_in_thread(
    wf: &Workflow<'_>,
    step: &ModeratorSubmit,
    link: &Permalink,
    reported: &Message,
) -> Result<usize> {
    let warning = PostMessage {
        channel: link.channel.clone(),
        text: step.message.clone(),
        attachments: Vec::new(),
        thread_ts: Some(reported.thread_root().to_string()),
    };
    wf.slack.bot.post_message(&warning).await?;
    Ok(1)
}

/// Redacts every reply, newest first, then the root once all replies are done.
async fn remove_thread(
    wf: &Workflow<'_>,
    step: &ModeratorSubmit,
    link: &Permalink,
    reported: &Message,
) -> Result<usize> {
    let root_ts = reported.thread_root().to_string();
    let thread = wf.slack.user.replies(&link.channel, &root_ts, None).await?;

    let mut replies: Vec<String> = thread
        .into_iter()
        .map(|message| message.ts)
        .filter(|ts| *ts != root_ts)
        .collect();
    replies.sort_unstable_by(|a, b| b.cmp(a));
    replies.dedup();

    let text = compose::redaction_text(&step.message);
    let redact = |ts: String| UpdateMessage {
        channel: link.channel.clone(),
        ts,
        text: text.clone(),
        attachments: Vec::new(),
    };

    let reply_updates: Vec<UpdateMessage> = replies.into_iter().map(&redact).collect();
    try_join_all(
        reply_updates
            .iter()
            .map(|update| wf.slack.user.update_message(update)),
    )
    .await?;

    wf.slack.user.update_message(&redact(root_ts)).await?;
    Ok(reply_updates.len() + 1)
}

/// Read-modify-write of the moderator report. Concurrent moderator actions on
/// the same report race; the last update wins.
async fn append_audit_entry(wf: &Workflow<'_>, step: &ModeratorSubmit, link: &Permalink) -> Result<()> {
    let channel = &wf.config.moderator_channel;
    let report = wf
        .slack
        .user
        .history(channel, &step.report_ts, 1)
        .await?
        .into_iter()
        .next()
        .filter(|message| message.ts == step.report_ts)
        .ok_or_else(|| {
            ModerationError::MessageNotFound(format!("report {} in {}", step.report_ts, channel))
        })?;

    let footer = compose::audit_footer(step.kind, &step.moderator, &link.channel);
    let addendum = compose::audit_addendum(footer, &step.message, step.action_ts.as_deref());
    let update = compose::append_audit(report, channel, addendum, step.kind.removes_content());
    wf.slack.bot.update_message(&update).await
}
