//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, User};

use otscore::registration::dispatch::Inbound;

use super::admin::{handle_armed_reply, handle_callback, handle_review_reply};
use super::applicant::{handle_inbound, inbound_from_message};
use super::types::{actor_id, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::markdown::send_message_markdown_v2;
use crate::telegram::messages;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Review chat replies and armed admin replies are matched before the
/// applicant branches so an administrator's text is never taken as wizard
/// input.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        // Replies to review posts in a channel
        .branch(review_channel_handler(deps.clone()))
        // Replies to review posts in a group used as review chat
        .branch(review_group_handler(deps.clone()))
        // Admin text after pressing Reply
        .branch(admin_reply_handler(deps.clone()))
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps))
}

fn review_channel_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let review_chat = deps.review_chat();
    Update::filter_channel_post()
        .filter(move |msg: Message| msg.chat.id == review_chat && msg.reply_to_message().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_review_reply(&bot, &deps, &msg).await }
        })
}

fn review_group_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let filter_deps = deps.clone();
    Update::filter_message()
        .filter(move |msg: Message| {
            msg.chat.id == filter_deps.review_chat()
                && msg.reply_to_message().is_some()
                && msg.from.as_ref().is_some_and(|u| filter_deps.is_admin(u))
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move { handle_review_reply(&bot, &deps, &msg).await }
        })
}

fn admin_reply_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let filter_deps = deps.clone();
    Update::filter_message()
        .filter(move |msg: Message| {
            let armed = msg
                .from
                .as_ref()
                .and_then(actor_id)
                .is_some_and(|id| filter_deps.core.approvals.is_admin(id) && filter_deps.core.reply_targets.is_armed(id));
            armed && msg.chat.is_private() && msg.text().is_some_and(|t| !t.starts_with('/'))
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(admin) = msg.from.as_ref().and_then(actor_id) else {
                    return Ok(());
                };
                handle_armed_reply(&bot, &deps, &msg, admin).await
            }
        })
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .branch(dptree::entry().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let deps = deps.clone();
                async move {
                    log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
                    let Some(user) = msg.from.as_ref() else {
                        return Ok(());
                    };
                    let inbound = match cmd {
                        Command::Start => Inbound::Start,
                        Command::Status => Inbound::Status,
                        Command::Help => Inbound::About,
                    };
                    respond(&bot, &deps, &msg, user, inbound).await
                }
            },
        ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let (Some(user), Some(inbound)) = (msg.from.as_ref(), inbound_from_message(&msg)) else {
                    return Ok(());
                };
                respond(&bot, &deps, &msg, user, inbound).await
            }
        })
}

/// Runs an applicant event; failures are logged and answered with a generic apology.
async fn respond(bot: &Bot, deps: &HandlerDeps, msg: &Message, user: &User, inbound: Inbound) -> Result<(), HandlerError> {
    if let Err(e) = handle_inbound(bot, deps, user, inbound).await {
        log::error!("Failed to handle message from {}: {}", user.id, e);
        let _ = send_message_markdown_v2(bot, msg.chat.id, messages::something_went_wrong(), None).await;
    }
    Ok(())
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move { handle_callback(&bot, &deps, &q).await }
    })
}
