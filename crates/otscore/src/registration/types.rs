//! Applicant record, wizard steps and registration statuses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable applicant identity (the applicant's Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicantId(pub i64);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApplicantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(ApplicantId)
    }
}

/// Wizard step, in collection order.
///
/// `None` is the position before registration starts and `Done` the position
/// after the last field was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    #[default]
    None,
    Name,
    Phone,
    ChannelUrl,
    Email,
    Subject,
    Done,
}

impl Step {
    /// Steps that collect a field, in order.
    pub const COLLECTING: [Step; 5] = [Step::Name, Step::Phone, Step::ChannelUrl, Step::Email, Step::Subject];

    /// Next step along the forward edge.
    pub fn next(self) -> Step {
        match self {
            Step::None => Step::Name,
            Step::Name => Step::Phone,
            Step::Phone => Step::ChannelUrl,
            Step::ChannelUrl => Step::Email,
            Step::Email => Step::Subject,
            Step::Subject | Step::Done => Step::Done,
        }
    }

    /// Immediate predecessor, `None` when already at the start.
    pub fn previous(self) -> Option<Step> {
        match self {
            Step::None => None,
            Step::Name => Some(Step::None),
            Step::Phone => Some(Step::Name),
            Step::ChannelUrl => Some(Step::Phone),
            Step::Email => Some(Step::ChannelUrl),
            Step::Subject => Some(Step::Email),
            Step::Done => Some(Step::Subject),
        }
    }

    /// 1-based position among the collecting steps ("Step 2/5").
    pub fn position(self) -> Option<usize> {
        Self::COLLECTING.iter().position(|s| *s == self).map(|i| i + 1)
    }

    pub fn is_collecting(self) -> bool {
        self.position().is_some()
    }
}

/// Registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    Collecting,
    PendingReview,
    Approved,
    Rejected,
    PendingPayment,
    PaymentVerified,
}

impl Status {
    /// Before a submission exists; the only statuses eligible for session expiry.
    pub fn is_pre_submission(self) -> bool {
        matches!(self, Status::Idle | Status::Collecting)
    }

    /// A submission is waiting on the admin or the applicant is in the payment phase.
    pub fn has_submission_in_flight(self) -> bool {
        matches!(
            self,
            Status::PendingReview | Status::Approved | Status::PendingPayment | Status::PaymentVerified
        )
    }

    /// The admin has already ruled on the submission.
    pub fn is_decided(self) -> bool {
        matches!(
            self,
            Status::Approved | Status::Rejected | Status::PendingPayment | Status::PaymentVerified
        )
    }

    /// Human label, e.g. "PENDING REVIEW".
    pub fn label(self) -> String {
        self.to_string().replace('_', " ").to_uppercase()
    }
}

/// Fields collected by the wizard. Each one is written only after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub channel_url: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
}

impl ApplicantFields {
    /// First word of the name, used as the gateway's `first_name`.
    pub fn first_name(&self) -> Option<&str> {
        self.name.as_deref().and_then(|n| n.split_whitespace().next())
    }

    /// Everything after the first word of the name.
    pub fn last_name(&self) -> Option<String> {
        let rest: Vec<&str> = self.name.as_deref()?.split_whitespace().skip(1).collect();
        if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        }
    }
}

/// One record per applicant, owned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub id: ApplicantId,
    pub username: Option<String>,
    pub step: Step,
    pub status: Status,
    pub fields: ApplicantFields,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Set by a rejection and kept when the applicant re-registers.
    pub rejected_before: bool,
    /// Outcome of the last fee computation; never billed from directly.
    pub penalty_applied: bool,
    pub transaction_ref: Option<String>,
    pub paid_amount: Option<f64>,
    pub commission: Option<f64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

impl ApplicantRecord {
    pub fn new(id: ApplicantId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: None,
            step: Step::None,
            status: Status::Idle,
            fields: ApplicantFields::default(),
            created_at: now,
            submitted_at: None,
            approved_at: None,
            rejected_before: false,
            penalty_applied: false,
            transaction_ref: None,
            paid_amount: None,
            commission: None,
            paid_at: None,
            last_activity: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_walk_visits_every_step_once() {
        let mut step = Step::None;
        let mut seen = vec![step];
        while step != Step::Done {
            step = step.next();
            seen.push(step);
        }
        assert_eq!(
            seen,
            vec![
                Step::None,
                Step::Name,
                Step::Phone,
                Step::ChannelUrl,
                Step::Email,
                Step::Subject,
                Step::Done
            ]
        );
    }

    #[test]
    fn test_previous_is_inverse_of_next() {
        for step in Step::COLLECTING {
            assert_eq!(step.next().previous(), Some(step));
        }
        assert_eq!(Step::None.previous(), None);
    }

    #[test]
    fn test_position() {
        assert_eq!(Step::Name.position(), Some(1));
        assert_eq!(Step::Subject.position(), Some(5));
        assert_eq!(Step::Done.position(), None);
        assert_eq!(Step::None.position(), None);
    }

    #[test]
    fn test_status_label() {
        assert_eq!(Status::PendingReview.label(), "PENDING REVIEW");
        assert_eq!(Status::PaymentVerified.to_string(), "payment_verified");
    }

    #[test]
    fn test_name_split() {
        let fields = ApplicantFields {
            name: Some("Jane  van Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(fields.first_name(), Some("Jane"));
        assert_eq!(fields.last_name().as_deref(), Some("van Doe"));

        let single = ApplicantFields {
            name: Some("Abebe".to_string()),
            ..Default::default()
        };
        assert_eq!(single.last_name(), None);
    }

    #[test]
    fn test_applicant_id_parse() {
        assert_eq!(" 42 ".parse::<ApplicantId>().ok(), Some(ApplicantId(42)));
        assert!("abc".parse::<ApplicantId>().is_err());
    }
}
