//! Checkout links sent to applicants

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;

use otscore::core::error::{RegistrationError, RegistrationResult};
use otscore::payment::orchestrator::Checkout;
use otscore::registration::types::ApplicantId;
use otscore::Core;

use super::keyboards;
use super::markdown::send_message_markdown_v2;
use super::messages::{self, Pricing};

/// Creates (or reuses) a checkout and sends the link to the applicant.
///
/// Failures are reported to the applicant as well as returned.
pub async fn send_checkout(
    bot: &Bot,
    core: &Core,
    pricing: &Pricing,
    applicant: ApplicantId,
) -> RegistrationResult<Checkout> {
    let chat_id = ChatId(applicant.0);
    match core.payments.initiate(applicant, Utc::now()).await {
        Ok(checkout) => {
            let mut text = messages::checkout(&checkout, pricing);
            let button = keyboards::checkout_button(&checkout.checkout_url);
            if button.is_none() {
                text.push_str(&messages::checkout_link_line(&checkout.checkout_url));
            }
            if let Err(e) = send_message_markdown_v2(bot, chat_id, text, button.map(ReplyMarkup::InlineKeyboard)).await {
                log::error!("Failed to send checkout link to {}: {}", applicant, e);
            }
            Ok(checkout)
        }
        Err(e) => {
            let text = match &e {
                RegistrationError::InvalidState { .. } | RegistrationError::NotFound(_) => {
                    log::debug!("No payment due for {}: {}", applicant, e);
                    messages::payment_not_available()
                }
                _ => messages::checkout_failed(),
            };
            if let Err(send_err) = send_message_markdown_v2(bot, chat_id, text, None).await {
                log::error!("Failed to notify {} about checkout failure: {}", applicant, send_err);
            }
            Err(e)
        }
    }
}
