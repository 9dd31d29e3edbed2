//! Per-step input validators
//!
//! One validator per wizard step, each mapping raw input to either the value
//! to store or the reason shown to the applicant.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::types::{ApplicantId, Step};

/// Mobile numbers: optional country prefix, then `9` and eight digits.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\+251|251|0)?(9\d{8})$").expect("phone regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// Channel, user and handle shapes of the supported platforms.
static CHANNEL_URL_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)youtube\.com/channel/[^\s/]+",
        r"(?i)youtube\.com/c/[^\s/]+",
        r"(?i)youtube\.com/user/[^\s/]+",
        r"(?i)youtube\.com/@[^\s/]+",
        r"(?i)youtu\.be/[^\s/]+",
        r"(?i)(?:^|//|\s)t\.me/[A-Za-z0-9_]{3,}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("channel url regex"))
    .collect()
});

/// Literal token accepted for optional fields.
pub const SKIP_TOKEN: &str = "skip";

/// Minimum trimmed length of free-text fields.
const MIN_TEXT_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please send a text message.")]
    MissingText,

    #[error("Please enter a valid name (at least 2 characters).")]
    NameTooShort,

    #[error("Please enter a valid phone number (e.g., 0912345678 or +251912345678).")]
    InvalidPhone,

    #[error("Please share your own contact, or type your phone number.")]
    ForeignContact,

    #[error("A channel link is required for registration.")]
    ChannelUrlRequired,

    #[error("Please enter a valid channel URL (e.g., https://youtube.com/@yourchannel).")]
    InvalidChannelUrl,

    #[error("Please enter a valid email (e.g., name@example.com) or type 'Skip'.")]
    InvalidEmail,

    #[error("An email address is required (e.g., name@example.com).")]
    EmailRequired,

    #[error("Please enter at least one subject you teach.")]
    SubjectTooShort,

    #[error("Nothing to fill in at this point.")]
    NoInputExpected,
}

/// Raw inbound value for a wizard step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    Text(String),
    /// A shared contact card; `owner` is the Telegram user it belongs to.
    Contact { phone: String, owner: Option<ApplicantId> },
}

impl StepInput {
    pub fn text(s: impl Into<String>) -> Self {
        StepInput::Text(s.into())
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            StepInput::Text(t) => Some(t),
            StepInput::Contact { .. } => None,
        }
    }
}

/// Which optional fields may be skipped in this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRules {
    pub channel_url_required: bool,
    pub email_required: bool,
}

impl Default for FieldRules {
    fn default() -> Self {
        Self {
            channel_url_required: true,
            email_required: false,
        }
    }
}

/// Validated value for the step. `None` means the field was skipped.
pub type Accepted = Option<String>;

/// Validates input for `step` on behalf of `requester`.
pub fn validate_step(
    step: Step,
    input: &StepInput,
    requester: ApplicantId,
    rules: FieldRules,
) -> Result<Accepted, ValidationError> {
    match step {
        Step::Name => validate_name(input.as_text().ok_or(ValidationError::MissingText)?).map(Some),
        Step::Phone => validate_phone(input, requester).map(Some),
        Step::ChannelUrl => validate_channel_url(
            input.as_text().ok_or(ValidationError::MissingText)?,
            rules.channel_url_required,
        ),
        Step::Email => validate_email(input.as_text().ok_or(ValidationError::MissingText)?, rules.email_required),
        Step::Subject => validate_subject(input.as_text().ok_or(ValidationError::MissingText)?).map(Some),
        Step::None | Step::Done => Err(ValidationError::NoInputExpected),
    }
}

fn has_min_chars(s: &str) -> bool {
    s.chars().count() >= MIN_TEXT_CHARS
}

pub fn validate_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if !has_min_chars(name) {
        return Err(ValidationError::NameTooShort);
    }
    Ok(name.to_string())
}

/// Accepts a contact card owned by the requester or a typed number.
///
/// Returns the number normalized to `+2519XXXXXXXX`.
pub fn validate_phone(input: &StepInput, requester: ApplicantId) -> Result<String, ValidationError> {
    let raw = match input {
        StepInput::Contact { phone, owner } => {
            if *owner != Some(requester) {
                return Err(ValidationError::ForeignContact);
            }
            phone.as_str()
        }
        StepInput::Text(text) => text.as_str(),
    };
    normalize_phone(raw).ok_or(ValidationError::InvalidPhone)
}

pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    PHONE_RE
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("+251{}", m.as_str()))
}

pub fn is_valid_channel_url(url: &str) -> bool {
    CHANNEL_URL_RES.iter().any(|re| re.is_match(url))
}

pub fn validate_channel_url(raw: &str, required: bool) -> Result<Accepted, ValidationError> {
    let url = raw.trim();
    if url.is_empty() || url.eq_ignore_ascii_case(SKIP_TOKEN) {
        return if required {
            Err(ValidationError::ChannelUrlRequired)
        } else {
            Ok(None)
        };
    }
    if !is_valid_channel_url(url) {
        return Err(ValidationError::InvalidChannelUrl);
    }
    Ok(Some(url.to_string()))
}

pub fn validate_email(raw: &str, required: bool) -> Result<Accepted, ValidationError> {
    let email = raw.trim();
    if email.eq_ignore_ascii_case(SKIP_TOKEN) {
        return if required {
            Err(ValidationError::EmailRequired)
        } else {
            Ok(None)
        };
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(Some(email.to_string()))
}

pub fn validate_subject(raw: &str) -> Result<String, ValidationError> {
    let subject = raw.trim();
    if !has_min_chars(subject) {
        return Err(ValidationError::SubjectTooShort);
    }
    Ok(subject.to_string())
}
