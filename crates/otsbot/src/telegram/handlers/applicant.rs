//! Applicant-side message handling
//!
//! Every private message is decoded into an [`Inbound`] event and routed once
//! through the core dispatch table.

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{ReplyMarkup, User};

use otscore::core::error::RegistrationError;
use otscore::registration::dispatch::{route, Inbound, Route};
use otscore::registration::types::{ApplicantId, ApplicantRecord, Status, Step};
use otscore::registration::validation::StepInput;
use otscore::registration::wizard::{BackOutcome, StepOutcome};

use super::types::{applicant_id, HandlerDeps, HandlerError};
use crate::telegram::checkout::send_checkout;
use crate::telegram::keyboards;
use crate::telegram::markdown::send_message_markdown_v2;
use crate::telegram::messages;

/// Decodes a private message into an inbound event.
pub fn inbound_from_message(msg: &Message) -> Option<Inbound> {
    if let Some(contact) = msg.contact() {
        return Some(Inbound::Contact {
            phone: contact.phone_number.clone(),
            owner: contact
                .user_id
                .and_then(|id| i64::try_from(id.0).ok())
                .map(ApplicantId),
        });
    }
    msg.text().map(keyboards::inbound_from_text)
}

fn step_input(inbound: Inbound) -> Option<StepInput> {
    match inbound {
        Inbound::Text(text) => Some(StepInput::Text(text)),
        Inbound::Contact { phone, owner } => Some(StepInput::Contact { phone, owner }),
        _ => None,
    }
}

async fn reply(
    bot: &Bot,
    chat_id: ChatId,
    text: String,
    markup: Option<ReplyMarkup>,
) -> Result<(), HandlerError> {
    send_message_markdown_v2(bot, chat_id, text, markup).await?;
    Ok(())
}

fn keyboard(markup: teloxide::types::KeyboardMarkup) -> Option<ReplyMarkup> {
    Some(ReplyMarkup::Keyboard(markup))
}

/// Handles one applicant event from a private chat.
pub async fn handle_inbound(bot: &Bot, deps: &HandlerDeps, user: &User, inbound: Inbound) -> Result<(), HandlerError> {
    let Some(id) = applicant_id(user) else {
        return Ok(());
    };
    let chat_id = ChatId(id.0);
    let core = &deps.core;

    if !core.rate_limiter.check(id).await {
        log::warn!("Rate limit exceeded for applicant {}", id);
        return reply(bot, chat_id, messages::too_many_requests(), None).await;
    }

    let now = Utc::now();
    let record = {
        let _guard = core.registry.lock(id).await;
        core.registry.touch(id, now);
        core.registry.get(id)
    };
    let route = route(&inbound, record.as_ref());
    log::debug!("Applicant {} event {:?} routed to {:?}", id, inbound, route);

    match route {
        Route::Open => {
            let record = core.wizard.open(id, user.username.clone(), now).await;
            let text = if record.status == Status::PaymentVerified {
                messages::welcome_back_member()
            } else {
                messages::welcome()
            };
            reply(bot, chat_id, text, keyboard(keyboards::for_status(record.status))).await
        }
        Route::StartWizard => match core.wizard.start(id, user.username.clone(), now).await {
            Ok(_) => {
                let prompt = messages::step_prompt(Step::Name, core.wizard.rules());
                reply(bot, chat_id, prompt, keyboard(keyboards::for_step(Step::Name))).await
            }
            Err(RegistrationError::AlreadySubmitted { .. }) => show_status(bot, deps, id, chat_id).await,
            Err(e) => Err(e.into()),
        },
        Route::CancelWizard => {
            core.wizard.cancel(id, now).await?;
            reply(bot, chat_id, messages::cancelled(), keyboard(keyboards::main_menu())).await
        }
        Route::StepBack => match core.wizard.back(id, now).await? {
            BackOutcome::Rewound(step) => {
                let text = messages::returned_to(step, core.wizard.rules());
                reply(bot, chat_id, text, keyboard(keyboards::for_step(step))).await
            }
            BackOutcome::LeftWizard => reply(bot, chat_id, messages::cancelled(), keyboard(keyboards::main_menu())).await,
            BackOutcome::AlreadyAtFirst => Ok(()),
        },
        Route::StepInput => {
            let Some(input) = step_input(inbound) else {
                return Ok(());
            };
            match core.wizard.submit(id, input, now).await {
                Ok(StepOutcome::Advanced { next }) => {
                    let prompt = messages::step_prompt(next, core.wizard.rules());
                    reply(bot, chat_id, prompt, keyboard(keyboards::for_step(next))).await
                }
                // Confirmation comes from the notifier once the review post is out.
                Ok(StepOutcome::Submitted(_)) => Ok(()),
                Err(RegistrationError::Validation(err)) => {
                    let step = core.registry.get(id).map(|r| r.step).unwrap_or(Step::Name);
                    reply(bot, chat_id, messages::invalid_input(&err), keyboard(keyboards::for_step(step))).await
                }
                Err(e) => Err(e.into()),
            }
        }
        Route::ShowStatus => show_status(bot, deps, id, chat_id).await,
        Route::ShowAbout => reply(bot, chat_id, messages::about(&deps.pricing), None).await,
        Route::ShowDashboard => match record {
            Some(record) => {
                let text = messages::dashboard(&record, &deps.pricing);
                reply(bot, chat_id, text, keyboard(keyboards::member_menu())).await
            }
            None => Ok(()),
        },
        Route::ShowSupport => reply(bot, chat_id, messages::support(), None).await,
        Route::InitiatePayment => {
            // The applicant has already been told about failures.
            let _ = send_checkout(bot, core, &deps.pricing, id).await;
            Ok(())
        }
        Route::AwaitReview => reply(bot, chat_id, messages::awaiting_review(), None).await,
        Route::Unregistered => reply(bot, chat_id, messages::unregistered(), keyboard(keyboards::main_menu())).await,
        Route::Ignore => Ok(()),
    }
}

async fn show_status(bot: &Bot, deps: &HandlerDeps, id: ApplicantId, chat_id: ChatId) -> Result<(), HandlerError> {
    let record: Option<ApplicantRecord> = deps.core.registry.get(id);
    let fee = record.as_ref().and_then(|r| match r.status {
        Status::Approved | Status::PendingPayment => Some(deps.core.payments.fees().quote(r, Utc::now())),
        _ => None,
    });
    let text = messages::status(record.as_ref(), fee, &deps.pricing);
    let markup = record.as_ref().map(|r| match r.status {
        Status::Approved | Status::PendingPayment => ReplyMarkup::InlineKeyboard(keyboards::pay_button(id)),
        status => ReplyMarkup::Keyboard(keyboards::for_status(status)),
    });
    reply(bot, chat_id, text, markup).await
}

/// Pay Now button pressed by the applicant it belongs to.
pub async fn handle_pay(bot: &Bot, deps: &HandlerDeps, user: &User) -> Result<(), HandlerError> {
    handle_inbound(bot, deps, user, Inbound::PayNow).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_only_text_and_contacts_are_step_input() {
        assert_eq!(step_input(Inbound::Text("Jane".to_string())), Some(StepInput::text("Jane")));
        let contact = Inbound::Contact {
            phone: "+251912345678".to_string(),
            owner: Some(ApplicantId(5)),
        };
        assert_eq!(
            step_input(contact),
            Some(StepInput::Contact {
                phone: "+251912345678".to_string(),
                owner: Some(ApplicantId(5)),
            })
        );
        assert_eq!(step_input(Inbound::Back), None);
    }
}
