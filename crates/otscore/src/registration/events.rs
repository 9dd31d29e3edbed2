//! Registration events
//!
//! Components emit [`RegistrationEvent`]s through an mpsc channel. The
//! Telegram layer turns them into messages; the core has no Telegram
//! dependency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::fee::Fee;
use super::types::{ApplicantFields, ApplicantId};

/// Best-effort metadata about the review channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub title: Option<String>,
    pub invite_link: Option<String>,
    pub member_count: Option<u32>,
}

/// Looks up review channel metadata. Failures are reported as `None`.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn review_channel(&self) -> Option<ChannelInfo>;
}

/// Directory that never knows anything.
pub struct NoDirectory;

#[async_trait]
impl ChannelDirectory for NoDirectory {
    async fn review_channel(&self) -> Option<ChannelInfo> {
        None
    }
}

/// Snapshot of a finalized submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub applicant: ApplicantId,
    pub username: Option<String>,
    pub fields: ApplicantFields,
    pub submitted_at: DateTime<Utc>,
    pub channel: Option<ChannelInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub applicant: ApplicantId,
    pub tx_ref: String,
    pub amount: f64,
    pub commission: f64,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegistrationEvent {
    SubmissionReady(Submission),
    ApprovalGranted {
        applicant: ApplicantId,
        fee: Fee,
        currency: String,
        auto_initiate: bool,
    },
    SubmissionRejected {
        applicant: ApplicantId,
    },
    PaymentConfirmed(PaymentReceipt),
}

impl RegistrationEvent {
    pub fn applicant(&self) -> ApplicantId {
        match self {
            RegistrationEvent::SubmissionReady(s) => s.applicant,
            RegistrationEvent::ApprovalGranted { applicant, .. } => *applicant,
            RegistrationEvent::SubmissionRejected { applicant } => *applicant,
            RegistrationEvent::PaymentConfirmed(r) => r.applicant,
        }
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<RegistrationEvent>;

/// Sending half shared by every component.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<RegistrationEvent>,
}

impl EventBus {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emits an event. A closed receiver is logged, never an error for the caller.
    pub fn emit(&self, event: RegistrationEvent) {
        let applicant = event.applicant();
        if self.tx.send(event).is_err() {
            log::warn!("Event receiver closed, dropping event for applicant {}", applicant);
        }
    }
}
