//! Reply and inline keyboards

use teloxide::types::{ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use otscore::registration::callback::{CallbackCommand, CallbackKind};
use otscore::registration::dispatch::Inbound;
use otscore::registration::types::{ApplicantId, Status, Step};

pub const REGISTER: &str = "📝 Register";
pub const MY_STATUS: &str = "📊 My Status";
pub const ABOUT: &str = "ℹ️ About Platform";
pub const BACK: &str = "⬅️ Back";
pub const CANCEL: &str = "❌ Cancel";
pub const SHARE_PHONE: &str = "📲 Share Phone Number";
pub const DASHBOARD: &str = "📊 My Dashboard";
pub const SUPPORT: &str = "❓ Support";
pub const PAY_NOW: &str = "💳 Pay Now";

/// Maps a text message to an inbound event; anything that is not a button is input.
pub fn inbound_from_text(text: &str) -> Inbound {
    match text.trim() {
        REGISTER => Inbound::Register,
        MY_STATUS => Inbound::Status,
        ABOUT => Inbound::About,
        BACK => Inbound::Back,
        CANCEL => Inbound::Cancel,
        DASHBOARD => Inbound::Dashboard,
        SUPPORT => Inbound::Support,
        PAY_NOW => Inbound::PayNow,
        _ => Inbound::Text(text.to_string()),
    }
}

fn rows(labels: &[&[&str]]) -> Vec<Vec<KeyboardButton>> {
    labels
        .iter()
        .map(|row| row.iter().map(|label| KeyboardButton::new(*label)).collect())
        .collect()
}

/// Menu for applicants without an active registration.
pub fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(rows(&[&[REGISTER], &[MY_STATUS, ABOUT]])).resize_keyboard()
}

/// Menu for verified members.
pub fn member_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(rows(&[&[DASHBOARD, MY_STATUS], &[SUPPORT, ABOUT]])).resize_keyboard()
}

/// Back/Cancel navigation shown during the wizard.
pub fn wizard_nav() -> KeyboardMarkup {
    KeyboardMarkup::new(rows(&[&[BACK, CANCEL]])).resize_keyboard()
}

/// Phone step: contact sharing button above the navigation row.
pub fn phone_request() -> KeyboardMarkup {
    let mut keyboard = vec![vec![KeyboardButton::new(SHARE_PHONE).request(ButtonRequest::Contact)]];
    keyboard.extend(rows(&[&[BACK, CANCEL]]));
    KeyboardMarkup::new(keyboard).resize_keyboard().one_time_keyboard()
}

/// Keyboard matching the wizard position.
pub fn for_step(step: Step) -> KeyboardMarkup {
    match step {
        Step::Phone => phone_request(),
        _ => wizard_nav(),
    }
}

/// Keyboard matching the registration status outside the wizard.
pub fn for_status(status: Status) -> KeyboardMarkup {
    match status {
        Status::PaymentVerified => member_menu(),
        _ => main_menu(),
    }
}

fn callback(label: &str, kind: CallbackKind, applicant: ApplicantId) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, CallbackCommand::new(kind, applicant).encode())
}

/// Reply / Approve / Reject under a review message.
pub fn review_buttons(applicant: ApplicantId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        callback("💬 Reply", CallbackKind::Reply, applicant),
        callback("✅ Approve", CallbackKind::Approve, applicant),
        callback("❌ Reject", CallbackKind::Reject, applicant),
    ]])
}

/// Pay Now under an approval message.
pub fn pay_button(applicant: ApplicantId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![callback(PAY_NOW, CallbackKind::Pay, applicant)]])
}

/// Link button to a hosted checkout; `None` when the gateway returned an unusable URL.
pub fn checkout_button(checkout_url: &str) -> Option<InlineKeyboardMarkup> {
    let url = url::Url::parse(checkout_url).ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(PAY_NOW, url)]]))
}

/// Removes the inline keyboard when editing a message.
pub fn no_buttons() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(Vec::<Vec<InlineKeyboardButton>>::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_buttons_map_to_inbound_events() {
        assert_eq!(inbound_from_text("📝 Register"), Inbound::Register);
        assert_eq!(inbound_from_text("📊 My Status"), Inbound::Status);
        assert_eq!(inbound_from_text("⬅️ Back"), Inbound::Back);
        assert_eq!(inbound_from_text("❌ Cancel"), Inbound::Cancel);
        assert_eq!(inbound_from_text("📊 My Dashboard"), Inbound::Dashboard);
        assert_eq!(inbound_from_text("❓ Support"), Inbound::Support);
        assert_eq!(inbound_from_text("Jane Doe"), Inbound::Text("Jane Doe".to_string()));
    }

    #[test]
    fn test_review_buttons_carry_applicant() {
        let markup = review_buttons(ApplicantId(42));
        let data: Vec<String> = markup.inline_keyboard[0]
            .iter()
            .filter_map(|b| match &b.kind {
                teloxide::types::InlineKeyboardButtonKind::CallbackData(d) => Some(d.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(data, vec!["reply:42", "approve:42", "reject:42"]);
    }

    #[test]
    fn test_checkout_button_needs_valid_url() {
        assert!(checkout_button("https://checkout.chapa.co/checkout/payment/abc").is_some());
        assert!(checkout_button("not a url").is_none());
    }
}
