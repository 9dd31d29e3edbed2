//! Administrator decisions on submitted registrations

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::events::{EventBus, RegistrationEvent};
use super::fee::{Fee, FeeSchedule};
use super::registry::Registry;
use super::types::{ApplicantId, Status};
use crate::core::error::{RegistrationError, RegistrationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

pub struct ApprovalGate {
    registry: Arc<Registry>,
    admin_id: i64,
    fees: FeeSchedule,
    auto_initiate: bool,
    events: EventBus,
}

impl ApprovalGate {
    pub fn new(registry: Arc<Registry>, admin_id: i64, fees: FeeSchedule, auto_initiate: bool, events: EventBus) -> Self {
        Self {
            registry,
            admin_id,
            fees,
            auto_initiate,
            events,
        }
    }

    pub fn is_admin(&self, actor: i64) -> bool {
        actor == self.admin_id
    }

    pub fn admin_id(&self) -> i64 {
        self.admin_id
    }

    pub async fn decide(
        &self,
        decision: Decision,
        applicant: ApplicantId,
        actor: i64,
        now: DateTime<Utc>,
    ) -> RegistrationResult<Option<Fee>> {
        match decision {
            Decision::Approve => self.approve(applicant, actor, now).await.map(Some),
            Decision::Reject => self.reject(applicant, actor, now).await.map(|_| None),
        }
    }

    /// Approves a pending submission and prices it.
    pub async fn approve(&self, applicant: ApplicantId, actor: i64, now: DateTime<Utc>) -> RegistrationResult<Fee> {
        self.authorize(actor)?;
        let _guard = self.registry.lock(applicant).await;
        let mut record = self.registry.get(applicant).ok_or(RegistrationError::NotFound(applicant))?;
        Self::ensure_pending(applicant, record.status, "approve")?;

        record.status = Status::Approved;
        record.approved_at = Some(now);
        let fee = self.fees.charge(&mut record, now);
        record.touch(now);
        self.registry.save(record);

        log::info!(
            "Applicant {} approved by {} (fee {} {}, penalty: {})",
            applicant,
            actor,
            fee.amount,
            self.fees.currency,
            fee.penalty_applied
        );
        self.events.emit(RegistrationEvent::ApprovalGranted {
            applicant,
            fee,
            currency: self.fees.currency.clone(),
            auto_initiate: self.auto_initiate,
        });
        Ok(fee)
    }

    pub async fn reject(&self, applicant: ApplicantId, actor: i64, now: DateTime<Utc>) -> RegistrationResult<()> {
        self.authorize(actor)?;
        let _guard = self.registry.lock(applicant).await;
        let mut record = self.registry.get(applicant).ok_or(RegistrationError::NotFound(applicant))?;
        Self::ensure_pending(applicant, record.status, "reject")?;

        record.status = Status::Rejected;
        record.rejected_before = true;
        record.touch(now);
        self.registry.save(record);

        log::info!("Applicant {} rejected by {}", applicant, actor);
        self.events.emit(RegistrationEvent::SubmissionRejected { applicant });
        Ok(())
    }

    fn authorize(&self, actor: i64) -> RegistrationResult<()> {
        if !self.is_admin(actor) {
            log::warn!("Unauthorized review attempt by {}", actor);
            return Err(RegistrationError::Unauthorized { actor });
        }
        Ok(())
    }

    fn ensure_pending(applicant: ApplicantId, status: Status, operation: &'static str) -> RegistrationResult<()> {
        match status {
            Status::PendingReview => Ok(()),
            s if s.is_decided() => Err(RegistrationError::AlreadyDecided { applicant, status: s }),
            s => Err(RegistrationError::InvalidState { operation, status: s }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::events::EventReceiver;
    use chrono::Duration;

    const ADMIN: i64 = 1;
    const ID: ApplicantId = ApplicantId(42);

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    fn gate() -> (ApprovalGate, Arc<Registry>, EventReceiver) {
        let registry = Arc::new(Registry::in_memory());
        let (events, rx) = EventBus::channel();
        let gate = ApprovalGate::new(Arc::clone(&registry), ADMIN, FeeSchedule::default(), false, events);
        (gate, registry, rx)
    }

    fn pending(registry: &Registry) {
        let mut record = registry.create(ID, now());
        record.status = Status::PendingReview;
        registry.save(record);
    }

    #[tokio::test]
    async fn test_only_admin_can_decide() {
        let (gate, registry, mut rx) = gate();
        pending(&registry);
        let err = gate.approve(ID, 99, now()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Unauthorized { actor: 99 }));
        let err = gate.reject(ID, 99, now()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Unauthorized { actor: 99 }));
        assert_eq!(registry.get(ID).map(|r| r.status), Some(Status::PendingReview));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_approve_prices_and_emits() {
        let (gate, registry, mut rx) = gate();
        pending(&registry);
        let fee = gate.approve(ID, ADMIN, now()).await.unwrap();
        assert_eq!(fee.amount, 99.0);

        let record = registry.get(ID).unwrap();
        assert_eq!(record.status, Status::Approved);
        assert_eq!(record.approved_at, Some(now()));
        assert!(!record.penalty_applied);

        assert_eq!(
            rx.try_recv().unwrap(),
            RegistrationEvent::ApprovalGranted {
                applicant: ID,
                fee,
                currency: "ETB".to_string(),
                auto_initiate: false,
            }
        );
    }

    #[tokio::test]
    async fn test_second_decision_is_already_decided() {
        let (gate, registry, mut rx) = gate();
        pending(&registry);
        gate.approve(ID, ADMIN, now()).await.unwrap();
        rx.try_recv().unwrap();

        let err = gate.approve(ID, ADMIN, now()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyDecided { .. }));
        let err = gate.reject(ID, ADMIN, now()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyDecided { .. }));
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.get(ID).map(|r| r.status), Some(Status::Approved));
    }

    #[tokio::test]
    async fn test_reject_sets_history() {
        let (gate, registry, mut rx) = gate();
        pending(&registry);
        gate.decide(Decision::Reject, ID, ADMIN, now()).await.unwrap();
        let record = registry.get(ID).unwrap();
        assert_eq!(record.status, Status::Rejected);
        assert!(record.rejected_before);
        assert_eq!(rx.try_recv().unwrap(), RegistrationEvent::SubmissionRejected { applicant: ID });
    }

    #[tokio::test]
    async fn test_unknown_and_unsubmitted() {
        let (gate, registry, _rx) = gate();
        let err = gate.approve(ID, ADMIN, now()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::NotFound(ApplicantId(42))));

        registry.create(ID, now());
        let err = gate.approve(ID, ADMIN, now()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::InvalidState {
                status: Status::Idle,
                ..
            }
        ));
    }
}
