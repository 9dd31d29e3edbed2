//! Delivery of registration events to Telegram
//!
//! The core emits [`RegistrationEvent`]s; this loop turns each one into the
//! review channel post or applicant message it stands for. Each delivery runs
//! on its own task, so a slow checkout for one applicant holds up nobody else.

use std::future::Future;
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;

use otscore::registration::events::{EventReceiver, PaymentReceipt, RegistrationEvent, Submission};
use otscore::registration::fee::Fee;
use otscore::registration::types::ApplicantId;
use otscore::Core;

use super::checkout::send_checkout;
use super::keyboards;
use super::markdown::send_message_markdown_v2;
use super::messages::{self, Pricing};

/// Spawns one task per event. Events of one applicant are emitted in order by
/// the core under that applicant's lock.
async fn fan_out<F, Fut>(mut events: EventReceiver, deliver: F)
where
    F: Fn(RegistrationEvent) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    while let Some(event) = events.recv().await {
        tokio::spawn(deliver(event));
    }
}

pub struct Notifier {
    bot: Bot,
    core: Arc<Core>,
    pricing: Arc<Pricing>,
}

impl Notifier {
    pub fn new(bot: Bot, core: Arc<Core>, pricing: Arc<Pricing>) -> Self {
        Self { bot, core, pricing }
    }

    /// Runs until every sender is dropped.
    pub async fn run(self, events: EventReceiver) {
        log::info!("Notification loop started");
        let notifier = Arc::new(self);
        fan_out(events, move |event| {
            let notifier = Arc::clone(&notifier);
            async move {
                let applicant = event.applicant();
                if let Err(e) = notifier.deliver(event).await {
                    log::error!("Failed to deliver event for applicant {}: {}", applicant, e);
                }
            }
        })
        .await;
        log::warn!("Notification loop stopped: event bus closed");
    }

    async fn deliver(&self, event: RegistrationEvent) -> ResponseResult<()> {
        match event {
            RegistrationEvent::SubmissionReady(submission) => self.submission_ready(submission).await,
            RegistrationEvent::ApprovalGranted {
                applicant,
                fee,
                currency,
                auto_initiate,
            } => self.approval_granted(applicant, fee, &currency, auto_initiate).await,
            RegistrationEvent::SubmissionRejected { applicant } => {
                send_message_markdown_v2(
                    &self.bot,
                    ChatId(applicant.0),
                    messages::rejection(),
                    Some(ReplyMarkup::Keyboard(keyboards::main_menu())),
                )
                .await?;
                Ok(())
            }
            RegistrationEvent::PaymentConfirmed(receipt) => self.payment_confirmed(receipt).await,
        }
    }

    async fn submission_ready(&self, submission: Submission) -> ResponseResult<()> {
        let applicant = submission.applicant;
        let review = send_message_markdown_v2(
            &self.bot,
            ChatId(self.core.review_channel_id),
            messages::review_message(&submission),
            Some(ReplyMarkup::InlineKeyboard(keyboards::review_buttons(applicant))),
        )
        .await;
        match review {
            Ok(msg) => {
                self.core.correlation.remember(msg.id.0, applicant);
                log::info!("Posted review message {} for applicant {}", msg.id.0, applicant);
            }
            Err(e) => log::error!("Failed to post review message for applicant {}: {}", applicant, e),
        }

        send_message_markdown_v2(
            &self.bot,
            ChatId(applicant.0),
            messages::submission_confirmation(&self.pricing),
            Some(ReplyMarkup::Keyboard(keyboards::main_menu())),
        )
        .await?;
        Ok(())
    }

    async fn approval_granted(
        &self,
        applicant: ApplicantId,
        fee: Fee,
        currency: &str,
        auto_initiate: bool,
    ) -> ResponseResult<()> {
        let chat_id = ChatId(applicant.0);
        if !auto_initiate {
            send_message_markdown_v2(
                &self.bot,
                chat_id,
                messages::approval(&fee, currency, &self.pricing),
                Some(ReplyMarkup::InlineKeyboard(keyboards::pay_button(applicant))),
            )
            .await?;
            return Ok(());
        }

        send_message_markdown_v2(&self.bot, chat_id, messages::approval(&fee, currency, &self.pricing), None).await?;
        if send_checkout(&self.bot, &self.core, &self.pricing, applicant).await.is_err() {
            send_message_markdown_v2(
                &self.bot,
                chat_id,
                messages::retry_payment(),
                Some(ReplyMarkup::InlineKeyboard(keyboards::pay_button(applicant))),
            )
            .await?;
        }
        Ok(())
    }

    async fn payment_confirmed(&self, receipt: PaymentReceipt) -> ResponseResult<()> {
        send_message_markdown_v2(
            &self.bot,
            ChatId(receipt.applicant.0),
            messages::member_welcome(&receipt, &self.pricing),
            Some(ReplyMarkup::Keyboard(keyboards::member_menu())),
        )
        .await?;

        let name = self.core.registry.get(receipt.applicant).and_then(|r| r.fields.name);
        send_message_markdown_v2(
            &self.bot,
            ChatId(self.core.approvals.admin_id()),
            messages::admin_paid_notice(&receipt, name.as_deref()),
            None,
        )
        .await?;
        Ok(())
    }
}
