//! MarkdownV2 message templates
//!
//! Every dynamic value goes through [`escape_markdown_v2`]; static text is
//! pre-escaped.

use chrono::{DateTime, Utc};

use otscore::core::Settings;
use otscore::payment::orchestrator::{format_amount, Checkout};
use otscore::registration::events::{PaymentReceipt, Submission};
use otscore::registration::fee::Fee;
use otscore::registration::types::{ApplicantId, ApplicantRecord, Status, Step};
use otscore::registration::validation::{FieldRules, ValidationError};

use super::markdown::{bold, code, escape_markdown_v2 as esc};

const NOT_PROVIDED: &str = "Not provided";
const SUPPORT_EMAIL: &str = "hiabhiyu@gmail.com";
const SUPPORT_CONTACT: &str = "https://t.me/acespy";

/// Fee and commission figures quoted in messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Pricing {
    pub standard: f64,
    pub penalty: f64,
    pub currency: String,
    pub share: f64,
    pub penalty_after_hours: i64,
}

impl Pricing {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            standard: settings.fees.standard,
            penalty: settings.fees.penalty,
            currency: settings.fees.currency.clone(),
            share: settings.teacher_share,
            penalty_after_hours: settings.fees.penalty_after.num_hours(),
        }
    }

    fn share_percent(&self) -> String {
        format!("{}%", (self.share * 100.0).round() as i64)
    }

    fn money(&self, amount: f64) -> String {
        esc(&format!("{} {}", format_amount(amount), self.currency))
    }
}

fn or_not_provided(value: Option<&str>) -> String {
    esc(value.unwrap_or(NOT_PROVIDED))
}

fn timestamp(at: DateTime<Utc>) -> String {
    esc(&at.format("%Y-%m-%d %H:%M UTC").to_string())
}

pub fn welcome() -> String {
    "👋 *Welcome to OTS Teacher Registration System*\n\n\
     This is your professional platform to register as a verified teacher\\.\n\n\
     Please choose an option below to begin:"
        .to_string()
}

pub fn welcome_back_member() -> String {
    "👋 *Welcome back\\!*\n\nYour teacher profile is active\\. Use the menu below\\.".to_string()
}

/// Prompt for a collecting step, e.g. "Step 2/5".
pub fn step_prompt(step: Step, rules: FieldRules) -> String {
    let position = step.position().unwrap_or(1);
    let total = Step::COLLECTING.len();
    let header = |icon: &str, title: &str| format!("{} *Step {}/{} – {}*\n\n", icon, position, total, esc(title));

    match step {
        Step::Name => header("📝", "Full Name") + "Please enter your full legal name as it appears on your ID\\.",
        Step::Phone => {
            header("📱", "Phone Number")
                + "Please share your phone number using the secure button below, \
                   or type it \\(e\\.g\\. 0912345678\\)\\."
        }
        Step::ChannelUrl => {
            let title = if rules.channel_url_required {
                "Channel Link (Required)"
            } else {
                "Channel Link"
            };
            let mut text = header("🌐", title)
                + "Please enter your YouTube or Telegram channel link\\.\n\
                   Example: https://youtube\\.com/@yourchannel or https://t\\.me/yourchannel";
            if rules.channel_url_required {
                text.push_str("\n\nThis step is *mandatory* for registration\\.");
            } else {
                text.push_str("\n\nType 'Skip' to continue without a channel\\.");
            }
            text
        }
        Step::Email => {
            let mut text = header("📧", "Email Address");
            if rules.email_required {
                text.push_str("Enter your email address\\.");
            } else {
                text.push_str("Enter your email address, or type 'Skip' to continue without email\\.");
            }
            text + "\n\nExample: name@example\\.com"
        }
        Step::Subject => {
            header("📚", "Teaching Subject")
                + "What subject\\(s\\) do you teach? \\(e\\.g\\., Mathematics, Physics, English\\)\n\n\
                   Please be specific\\."
        }
        Step::None | Step::Done => welcome(),
    }
}

pub fn returned_to(step: Step, rules: FieldRules) -> String {
    format!("⬅️ Returned to previous step\\.\n\n{}", step_prompt(step, rules))
}

pub fn cancelled() -> String {
    "Registration cancelled\\. You can start over with /start anytime\\.".to_string()
}

pub fn invalid_input(err: &ValidationError) -> String {
    format!("⚠️ {}", esc(&err.to_string()))
}

pub fn submission_confirmation(pricing: &Pricing) -> String {
    format!(
        "✅ *Registration Submitted Successfully\\!*\n\n\
         Your registration is now under admin review\\.\n\n\
         📌 *Next Steps:*\n\
         1\\. Admin will review your information \\(usually within 24 hours\\)\n\
         2\\. If approved, you'll receive a secure payment link\n\
         3\\. Complete payment to activate your profile\n\n\
         💰 *Commission:* You earn {} of all app profits from students you refer\n\n\
         ⏱️ *Note:* Registration fee may increase if payment is delayed beyond {} hours\\.",
        esc(&pricing.share_percent()),
        pricing.penalty_after_hours
    )
}

/// Review channel post. The `User ID:` line lets admin replies be routed
/// even when the message id is no longer known.
pub fn review_message(submission: &Submission) -> String {
    let fields = &submission.fields;
    let username = submission
        .username
        .as_deref()
        .map(|u| esc(&format!("@{}", u)))
        .unwrap_or_else(|| esc("Not set"));
    let channel = submission.channel.clone().unwrap_or_default();
    let members = channel
        .member_count
        .map(|c| c.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        "📌 *New Teacher Registration Pending Review*\n\n\
         👤 *Name:* {}\n\
         🔗 *Username:* {}\n\
         📱 *Phone:* {}\n\
         📚 *Subject:* {}\n\
         🌐 *Channel:* {}\n\
         📧 *Email:* {}\n\
         🕒 *Registered:* {}\n\
         🆔 *User ID:* {}\n\n\
         🏷 *Telegram Channel Info:*\n\
         • Name: {}\n\
         • Link: {}\n\
         • Members: {}\n\n\
         💳 *Payment:* Pending\n\
         *Status:* Pending Review",
        or_not_provided(fields.name.as_deref()),
        username,
        or_not_provided(fields.phone.as_deref()),
        or_not_provided(fields.subject.as_deref()),
        or_not_provided(fields.channel_url.as_deref()),
        or_not_provided(fields.email.as_deref()),
        timestamp(submission.submitted_at),
        code(&submission.applicant.to_string()),
        esc(channel.title.as_deref().unwrap_or("Unknown")),
        esc(channel.invite_link.as_deref().unwrap_or("No link")),
        esc(&members),
    )
}

/// Plain-text line appended to a review message once decided.
pub fn decision_stamp(approved: bool, admin: Option<&str>) -> String {
    let verdict = if approved { "✅ APPROVED" } else { "❌ REJECTED" };
    match admin {
        Some(name) => format!("\n\n{} by @{}", verdict, name),
        None => format!("\n\n{}", verdict),
    }
}

/// `fee` is the current quote, shown while a payment is due.
pub fn status(record: Option<&ApplicantRecord>, fee: Option<Fee>, pricing: &Pricing) -> String {
    let mut text = "📄 *Your Current Registration Status*\n\n".to_string();
    let Some(record) = record.filter(|r| r.status != Status::Idle) else {
        text.push_str("You haven't started registration yet\\. Use /start to begin\\.");
        return text;
    };

    text.push_str(&format!("Status: {}\n", bold(&record.status.label())));
    match record.status {
        Status::Collecting => {
            if let Some(position) = record.step.position() {
                text.push_str(&format!(
                    "\n📝 Registration in progress: step {}/{}\\.",
                    position,
                    Step::COLLECTING.len()
                ));
            }
        }
        Status::PendingReview => text.push_str("\n⏳ Your application is being reviewed by admin\\."),
        Status::Approved | Status::PendingPayment => {
            let amount = fee.map(|f| f.amount).unwrap_or(pricing.standard);
            text.push_str(&format!("\n✅ Approved\\! Payment required: *{}*", pricing.money(amount)));
            if record.status == Status::PendingPayment {
                text.push_str("\n🔗 A checkout link was already sent; tap 💳 Pay Now to get it again\\.");
            }
        }
        Status::Rejected => text.push_str("\n❌ Your application was not approved\\. Please reapply\\."),
        Status::PaymentVerified => text.push_str(&format!(
            "\n💰 Payment verified\\! Commission rate: {}",
            esc(&pricing.share_percent())
        )),
        Status::Idle => {}
    }
    text
}

pub fn about(pricing: &Pricing) -> String {
    format!(
        "ℹ️ *About OTS Platform*\n\n\
         OTS \\(Online Teaching System\\) connects qualified teachers with students securely across Ethiopia\\.\n\n\
         *Features:*\n\
         • Secure payment processing via Chapa\n\
         • {} commission rate for teachers\n\
         • Direct student\\-teacher connection\n\
         • Admin\\-verified teachers only\n\
         • 24/7 support\n\n\
         *Registration Fee:* {} \\(Standard\\) / {} \\(After {}h\\)\n\n\
         Questions? Tap ❓ Support after registering or write to {}",
        esc(&pricing.share_percent()),
        pricing.money(pricing.standard),
        pricing.money(pricing.penalty),
        pricing.penalty_after_hours,
        esc(SUPPORT_EMAIL),
    )
}

pub fn dashboard(record: &ApplicantRecord, pricing: &Pricing) -> String {
    let fields = &record.fields;
    let paid = record
        .paid_amount
        .map(|a| pricing.money(a))
        .unwrap_or_else(|| esc(NOT_PROVIDED));
    let commission = record
        .commission
        .map(|c| pricing.money(c))
        .unwrap_or_else(|| esc("0"));
    let member_since = record.paid_at.map(timestamp).unwrap_or_else(|| esc("Unknown"));

    format!(
        "📊 *My Dashboard*\n\n\
         👤 *Profile*\n\
         • Name: {}\n\
         • Phone: {}\n\
         • Email: {}\n\
         • Subject: {}\n\n\
         🌐 *Channel*\n\
         • {}\n\n\
         💼 *Membership*\n\
         • Status: ACTIVE\n\
         • Member since: {}\n\
         • Registration paid: {}\n\
         • Commission credited: {}\n\
         • Commission rate: {}",
        or_not_provided(fields.name.as_deref()),
        or_not_provided(fields.phone.as_deref()),
        or_not_provided(fields.email.as_deref()),
        or_not_provided(fields.subject.as_deref()),
        or_not_provided(fields.channel_url.as_deref()),
        member_since,
        paid,
        commission,
        esc(&pricing.share_percent()),
    )
}

pub fn support() -> String {
    format!(
        "❓ *Support*\n\n\
         Need help with your registration or payment?\n\n\
         📧 Email: {}\n\
         💬 Telegram: {}\n\n\
         Please include your registration name in the message\\.",
        esc(SUPPORT_EMAIL),
        esc(SUPPORT_CONTACT),
    )
}

pub fn awaiting_review() -> String {
    "⏳ Your application is being reviewed by admin\\. You will be notified here\\.".to_string()
}

pub fn unregistered() -> String {
    "You haven't started registration yet\\. Use /start to begin\\.".to_string()
}

pub fn approval(fee: &Fee, currency: &str, pricing: &Pricing) -> String {
    let mut text = format!(
        "🎉 *Congratulations\\! Your registration is approved\\!*\n\n\
         💳 *Registration Fee: {}*\n\n\
         Tap the button below to pay securely via Chapa\\.",
        esc(&format!("{} {}", format_amount(fee.amount), currency))
    );
    if fee.penalty_applied {
        text.push_str("\n\n⚠️ The late registration fee applies to this application\\.");
    } else {
        text.push_str(&format!(
            "\n\n*Note:* Payment must be completed within {} hours to avoid penalty fees\\.",
            pricing.penalty_after_hours
        ));
    }
    text
}

pub fn rejection() -> String {
    "❌ *Registration Not Approved*\n\n\
     Unfortunately, your registration was not approved at this time\\.\n\n\
     You may reapply with updated information using 📝 Register\\.\n\n\
     Common reasons for rejection:\n\
     • Invalid channel link\n\
     • Incomplete information\n\
     • Unable to verify identity"
        .to_string()
}

pub fn checkout(checkout: &Checkout, pricing: &Pricing) -> String {
    let reused = if checkout.reused {
        "\n\nThis is your outstanding payment link\\."
    } else {
        ""
    };
    format!(
        "🔗 *Complete Your Payment*\n\n\
         Tap the button below to pay *{}* securely via Chapa\\.\n\n\
         *After Payment:*\n\
         Your account will be automatically activated once payment is confirmed\\.\n\n\
         ⏱️ *Payment window:* {} hours\n\
         🧾 Reference: {}{}",
        esc(&format!("{} {}", format_amount(checkout.amount), checkout.currency)),
        pricing.penalty_after_hours,
        code(&checkout.tx_ref),
        reused,
    )
}

/// Fallback when no link button can be built; the URL goes into the text.
pub fn checkout_link_line(checkout_url: &str) -> String {
    format!("\n\n{}", esc(checkout_url))
}

pub fn checkout_failed() -> String {
    "❌ Sorry, there was an error generating the payment link\\. Please try again later or contact support\\."
        .to_string()
}

pub fn retry_payment() -> String {
    "Tap 💳 Pay Now to request a new payment link\\.".to_string()
}

pub fn payment_not_available() -> String {
    "⚠️ There is no payment due for your registration right now\\.".to_string()
}

pub fn member_welcome(receipt: &PaymentReceipt, pricing: &Pricing) -> String {
    format!(
        "🎊 *WELCOME TO THE FAMILY\\!*\n\n\
         ✅ Payment of *{}* verified\\.\n\
         Your teacher profile is now *active*\\!\n\n\
         💰 *Commission Rate:* {} of all app profits\n\
         💼 *Next Steps:* Start sharing your referral link with students\n\n\
         Use 📊 My Dashboard to see your profile and ❓ Support if you need help\\.",
        esc(&format!("{} {}", format_amount(receipt.amount), receipt.currency)),
        esc(&pricing.share_percent()),
    )
}

pub fn admin_paid_notice(receipt: &PaymentReceipt, name: Option<&str>) -> String {
    format!(
        "💰 *NEW PAID MEMBER*\n\n\
         Teacher: {}\n\
         User ID: {}\n\
         Amount: {}\n\
         Commission: {}\n\
         Transaction: {}\n\
         Paid at: {}\n\n\
         Status: Payment verified",
        or_not_provided(name),
        code(&receipt.applicant.to_string()),
        esc(&format!("{} {}", format_amount(receipt.amount), receipt.currency)),
        esc(&format!("{} {}", format_amount(receipt.commission), receipt.currency)),
        code(&receipt.tx_ref),
        timestamp(receipt.paid_at),
    )
}

/// Administrator text relayed to an applicant.
pub fn admin_message(text: &str) -> String {
    format!("📩 *Message from OTS Administration*\n\n{}", esc(text))
}

pub fn reply_prompt(applicant: ApplicantId, name: Option<&str>) -> String {
    format!(
        "✍️ Please type your reply message for {} \\({}\\):",
        or_not_provided(name),
        code(&applicant.to_string())
    )
}

pub fn reply_delivered(applicant: ApplicantId) -> String {
    format!("✅ Reply delivered to {}\\.", code(&applicant.to_string()))
}

pub fn reply_unroutable() -> String {
    "⚠️ Cannot route this reply: no applicant is linked to that message\\.".to_string()
}

pub fn reply_failed(applicant: ApplicantId) -> String {
    format!("❌ Could not deliver the reply to {}\\.", code(&applicant.to_string()))
}

pub fn too_many_requests() -> String {
    "⚠️ Too many requests\\. Please wait a moment\\.".to_string()
}

pub fn something_went_wrong() -> String {
    "❌ Something went wrong\\. Please try again\\.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use otscore::registration::events::ChannelInfo;
    use otscore::registration::types::ApplicantFields;

    fn pricing() -> Pricing {
        Pricing {
            standard: 99.0,
            penalty: 149.0,
            currency: "ETB".to_string(),
            share: 0.55,
            penalty_after_hours: 24,
        }
    }

    fn submission(channel: Option<ChannelInfo>) -> Submission {
        Submission {
            applicant: ApplicantId(42),
            username: Some("jane_doe".to_string()),
            fields: ApplicantFields {
                name: Some("Jane Doe".to_string()),
                phone: Some("+251912345678".to_string()),
                channel_url: Some("https://youtube.com/@janedoe".to_string()),
                email: None,
                subject: Some("Mathematics".to_string()),
            },
            submitted_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            channel,
        }
    }

    #[test]
    fn test_step_prompts_are_numbered() {
        let rules = FieldRules::default();
        assert!(step_prompt(Step::Name, rules).contains("Step 1/5"));
        assert!(step_prompt(Step::Subject, rules).contains("Step 5/5"));
        assert!(step_prompt(Step::ChannelUrl, rules).contains("*mandatory*"));

        let relaxed = FieldRules {
            channel_url_required: false,
            email_required: false,
        };
        assert!(step_prompt(Step::ChannelUrl, relaxed).contains("'Skip'"));
    }

    #[test]
    fn test_review_message_carries_id_marker() {
        let text = review_message(&submission(None));
        assert!(text.contains("*User ID:* `42`"));
        assert!(text.contains("@jane\\_doe"));
        assert!(text.contains("\\+251912345678"));
        assert!(text.contains("📧 *Email:* Not provided"));
        assert!(text.contains("• Name: Unknown"));
        assert!(text.contains("• Link: No link"));
    }

    #[test]
    fn test_review_message_uses_channel_info() {
        let info = ChannelInfo {
            title: Some("OTS Review".to_string()),
            invite_link: Some("https://t.me/+abc".to_string()),
            member_count: Some(12),
        };
        let text = review_message(&submission(Some(info)));
        assert!(text.contains("• Name: OTS Review"));
        assert!(text.contains("• Link: https://t\\.me/\\+abc"));
        assert!(text.contains("• Members: 12"));
    }

    #[test]
    fn test_status_for_unknown_applicant() {
        assert!(status(None, None, &pricing()).contains("haven't started"));
    }

    #[test]
    fn test_status_shows_penalty_quote() {
        let mut record = ApplicantRecord::new(ApplicantId(1), Utc::now());
        record.status = Status::Approved;
        let fee = Fee {
            amount: 149.0,
            penalty_applied: true,
        };
        let text = status(Some(&record), Some(fee), &pricing());
        assert!(text.contains("*APPROVED*"));
        assert!(text.contains("*149 ETB*"));
    }

    #[test]
    fn test_about_lists_both_fees() {
        let text = about(&pricing());
        assert!(text.contains("99 ETB \\(Standard\\)"));
        assert!(text.contains("149 ETB \\(After 24h\\)"));
        assert!(text.contains("55%"));
    }

    #[test]
    fn test_admin_message_escapes_text() {
        assert_eq!(
            admin_message("Fix your link (please)."),
            "📩 *Message from OTS Administration*\n\nFix your link \\(please\\)\\."
        );
    }

    #[test]
    fn test_decision_stamp() {
        assert_eq!(decision_stamp(true, Some("admin")), "\n\n✅ APPROVED by @admin");
        assert_eq!(decision_stamp(false, None), "\n\n❌ REJECTED");
    }
}
