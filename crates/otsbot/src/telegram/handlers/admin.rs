//! Administrator actions: review decisions and replies to applicants

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{MaybeInaccessibleMessage, ReplyParameters};

use otscore::core::error::RegistrationError;
use otscore::registration::approval::Decision;
use otscore::registration::callback::{CallbackCommand, CallbackKind};
use otscore::registration::types::ApplicantId;

use super::applicant::handle_pay;
use super::types::{actor_id, HandlerDeps, HandlerError};
use crate::telegram::keyboards;
use crate::telegram::markdown::send_message_markdown_v2;
use crate::telegram::messages;

/// Routes an inline button press.
pub async fn handle_callback(bot: &Bot, deps: &HandlerDeps, q: &CallbackQuery) -> Result<(), HandlerError> {
    let Some(command) = q.data.as_deref().and_then(CallbackCommand::decode) else {
        log::warn!("Unknown callback payload {:?} from {}", q.data, q.from.id);
        bot.answer_callback_query(q.id.clone())
            .text("❌ Unknown action")
            .show_alert(true)
            .await?;
        return Ok(());
    };
    let Some(actor) = actor_id(&q.from) else {
        return Ok(());
    };

    if command.is_admin_action() && !deps.core.approvals.is_admin(actor) {
        log::warn!("User {} pressed {} without admin rights", actor, command);
        bot.answer_callback_query(q.id.clone())
            .text("Unauthorized")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    match command.kind {
        CallbackKind::Approve => decide(bot, deps, q, Decision::Approve, command.applicant, actor).await,
        CallbackKind::Reject => decide(bot, deps, q, Decision::Reject, command.applicant, actor).await,
        CallbackKind::Reply => arm_reply(bot, deps, q, command.applicant, actor).await,
        CallbackKind::Pay => {
            if ApplicantId(actor) != command.applicant {
                bot.answer_callback_query(q.id.clone())
                    .text("This payment button belongs to another applicant")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            bot.answer_callback_query(q.id.clone()).text("Generating payment link…").await?;
            handle_pay(bot, deps, &q.from).await
        }
    }
}

async fn decide(
    bot: &Bot,
    deps: &HandlerDeps,
    q: &CallbackQuery,
    decision: Decision,
    applicant: ApplicantId,
    actor: i64,
) -> Result<(), HandlerError> {
    let result = deps.core.approvals.decide(decision, applicant, actor, Utc::now()).await;
    let answer = match &result {
        Ok(_) => match decision {
            Decision::Approve => "✅ Teacher approved".to_string(),
            Decision::Reject => "❌ Teacher rejected".to_string(),
        },
        Err(RegistrationError::NotFound(_)) => "❌ User not found".to_string(),
        Err(RegistrationError::AlreadyDecided { status, .. }) => format!("Already decided: {}", status.label()),
        Err(e) => {
            log::warn!("Decision {:?} on {} failed: {}", decision, applicant, e);
            format!("❌ {}", e)
        }
    };
    bot.answer_callback_query(q.id.clone())
        .text(answer)
        .show_alert(result.is_err())
        .await?;

    if result.is_ok() {
        stamp_review_message(bot, q, matches!(decision, Decision::Approve)).await;
    }
    Ok(())
}

/// Appends the verdict to the review post and removes its buttons.
async fn stamp_review_message(bot: &Bot, q: &CallbackQuery, approved: bool) {
    let Some(MaybeInaccessibleMessage::Regular(message)) = q.message.as_ref() else {
        return;
    };
    let original = message.text().unwrap_or_default();
    let text = format!(
        "{}{}",
        original,
        messages::decision_stamp(approved, q.from.username.as_deref())
    );

    let mut edit = bot
        .edit_message_text(message.chat.id, message.id, text)
        .reply_markup(keyboards::no_buttons());
    if let Some(entities) = message.entities() {
        edit = edit.entities(entities.to_vec());
    }
    if let Err(e) = edit.await {
        log::error!("Failed to update review message {}: {}", message.id.0, e);
    }
}

async fn arm_reply(
    bot: &Bot,
    deps: &HandlerDeps,
    q: &CallbackQuery,
    applicant: ApplicantId,
    actor: i64,
) -> Result<(), HandlerError> {
    let Some(record) = deps.core.registry.get(applicant) else {
        bot.answer_callback_query(q.id.clone())
            .text("❌ User not found")
            .show_alert(true)
            .await?;
        return Ok(());
    };

    deps.core.reply_targets.arm(actor, applicant);
    log::info!("Admin {} is replying to applicant {}", actor, applicant);
    bot.answer_callback_query(q.id.clone()).text("Reply mode activated").await?;
    send_message_markdown_v2(
        bot,
        ChatId(actor),
        messages::reply_prompt(applicant, record.fields.name.as_deref()),
        None,
    )
    .await?;
    Ok(())
}

/// Relays administrator text to an applicant. Returns whether it was delivered.
pub async fn relay_to_applicant(bot: &Bot, applicant: ApplicantId, text: &str) -> bool {
    match send_message_markdown_v2(bot, ChatId(applicant.0), messages::admin_message(text), None).await {
        Ok(_) => {
            log::info!("Delivered admin reply to applicant {}", applicant);
            true
        }
        Err(e) => {
            log::error!("Failed to deliver admin reply to {}: {}", applicant, e);
            false
        }
    }
}

/// Text typed by the administrator after pressing Reply.
pub async fn handle_armed_reply(bot: &Bot, deps: &HandlerDeps, msg: &Message, admin: i64) -> Result<(), HandlerError> {
    let Some(applicant) = deps.core.reply_targets.take(admin) else {
        return Ok(());
    };
    let text = msg.text().unwrap_or_default();
    let confirmation = if relay_to_applicant(bot, applicant, text).await {
        messages::reply_delivered(applicant)
    } else {
        messages::reply_failed(applicant)
    };
    send_message_markdown_v2(bot, msg.chat.id, confirmation, None).await?;
    Ok(())
}

/// A reply to a review post inside the review chat.
pub async fn handle_review_reply(bot: &Bot, deps: &HandlerDeps, msg: &Message) -> Result<(), HandlerError> {
    let (Some(original), Some(text)) = (msg.reply_to_message(), msg.text()) else {
        return Ok(());
    };

    let notice = match deps.core.correlation.resolve_reply(original.id.0, original.text()) {
        Some(applicant) => {
            if relay_to_applicant(bot, applicant, text).await {
                messages::reply_delivered(applicant)
            } else {
                messages::reply_failed(applicant)
            }
        }
        None => {
            log::warn!("Cannot route reply to message {} in the review chat", original.id.0);
            messages::reply_unroutable()
        }
    };

    bot.send_message(msg.chat.id, notice)
        .parse_mode(teloxide::types::ParseMode::MarkdownV2)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}
