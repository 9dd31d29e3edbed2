//! Routing of administrator replies back to applicants

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::ApplicantId;

/// `ID: 123` marker embedded in every review message.
static ID_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bID:\s*`?(\d+)`?").expect("id marker regex"));

/// Review message id → applicant.
#[derive(Default)]
pub struct CorrelationMap {
    messages: DashMap<i32, ApplicantId>,
}

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, message_id: i32, applicant: ApplicantId) {
        self.messages.insert(message_id, applicant);
    }

    pub fn resolve(&self, message_id: i32) -> Option<ApplicantId> {
        self.messages.get(&message_id).map(|entry| *entry.value())
    }

    /// Resolves a reply, falling back to the `ID:` marker in the replied-to text.
    pub fn resolve_reply(&self, message_id: i32, original_text: Option<&str>) -> Option<ApplicantId> {
        self.resolve(message_id).or_else(|| original_text.and_then(parse_id_marker))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub fn parse_id_marker(text: &str) -> Option<ApplicantId> {
    ID_MARKER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Administrator → applicant armed by the "Reply" button.
///
/// The administrator's next free-text message goes to that applicant.
#[derive(Default)]
pub struct ReplyTargets {
    targets: DashMap<i64, ApplicantId>,
}

impl ReplyTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, admin: i64, applicant: ApplicantId) {
        self.targets.insert(admin, applicant);
    }

    /// Returns and clears the armed target.
    pub fn take(&self, admin: i64) -> Option<ApplicantId> {
        self.targets.remove(&admin).map(|(_, applicant)| applicant)
    }

    pub fn is_armed(&self, admin: i64) -> bool {
        self.targets.contains_key(&admin)
    }
}
