//! Registration wizard
//!
//! Linear state machine over [`Step`]: each accepted input writes one field and
//! moves forward exactly one edge, `back` moves exactly one edge backwards.
//! Completing the last step hands the submission over for review.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::events::{ChannelDirectory, EventBus, RegistrationEvent, Submission};
use super::registry::Registry;
use super::types::{ApplicantId, ApplicantRecord, Status, Step};
use super::validation::{validate_step, FieldRules, StepInput};
use crate::core::error::{RegistrationError, RegistrationResult};

/// Result of an accepted step input.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Field stored; prompt for `next`.
    Advanced { next: Step },
    /// Last field stored; the submission went out for review.
    Submitted(Submission),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Now at `step`; prompt for it again.
    Rewound(Step),
    /// Went back from the first step; the applicant is idle again.
    LeftWizard,
    AlreadyAtFirst,
}

pub struct Wizard {
    registry: Arc<Registry>,
    rules: FieldRules,
    directory: Arc<dyn ChannelDirectory>,
    events: EventBus,
}

impl Wizard {
    pub fn new(
        registry: Arc<Registry>,
        rules: FieldRules,
        directory: Arc<dyn ChannelDirectory>,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            rules,
            directory,
            events,
        }
    }

    pub fn rules(&self) -> FieldRules {
        self.rules
    }

    /// Greets an applicant: makes sure an idle record exists.
    ///
    /// A record with a submission in flight is only touched.
    pub async fn open(&self, id: ApplicantId, username: Option<String>, now: DateTime<Utc>) -> ApplicantRecord {
        let _guard = self.registry.lock(id).await;
        match self.registry.get(id) {
            Some(mut record) if record.status.has_submission_in_flight() => {
                record.touch(now);
                if username.is_some() {
                    record.username = username;
                }
                self.registry.save(record.clone());
                record
            }
            previous => {
                let record = self.fresh_record(id, username, previous.as_ref(), now);
                self.registry.save(record.clone());
                log::debug!("Opened record for applicant {}", id);
                record
            }
        }
    }

    /// Starts (or restarts) the wizard at the first step.
    pub async fn start(
        &self,
        id: ApplicantId,
        username: Option<String>,
        now: DateTime<Utc>,
    ) -> RegistrationResult<ApplicantRecord> {
        let _guard = self.registry.lock(id).await;
        let previous = self.registry.get(id);
        if let Some(record) = &previous {
            if record.status.has_submission_in_flight() {
                return Err(RegistrationError::AlreadySubmitted {
                    applicant: id,
                    status: record.status,
                });
            }
        }

        let mut record = self.fresh_record(id, username, previous.as_ref(), now);
        record.step = Step::Name;
        record.status = Status::Collecting;
        self.registry.save(record.clone());
        log::info!(
            "Applicant {} started registration (previously rejected: {})",
            id,
            record.rejected_before
        );
        Ok(record)
    }

    fn fresh_record(
        &self,
        id: ApplicantId,
        username: Option<String>,
        previous: Option<&ApplicantRecord>,
        now: DateTime<Utc>,
    ) -> ApplicantRecord {
        let mut record = self.registry.create(id, now);
        record.username = username.or_else(|| previous.and_then(|p| p.username.clone()));
        record.rejected_before = previous.is_some_and(|p| p.rejected_before);
        record
    }

    /// Validates `input` for the current step and advances on success.
    ///
    /// Invalid input leaves the record untouched apart from its activity time.
    pub async fn submit(&self, id: ApplicantId, input: StepInput, now: DateTime<Utc>) -> RegistrationResult<StepOutcome> {
        let (outcome, snapshot) = {
            let _guard = self.registry.lock(id).await;
            let mut record = self.registry.get(id).ok_or(RegistrationError::NotFound(id))?;
            if record.status != Status::Collecting || !record.step.is_collecting() {
                return Err(RegistrationError::InvalidState {
                    operation: "submit a step",
                    status: record.status,
                });
            }
            record.touch(now);

            let step = record.step;
            let value = match validate_step(step, &input, id, self.rules) {
                Ok(value) => value,
                Err(err) => {
                    self.registry.save(record);
                    log::debug!("Applicant {} rejected input at {}: {}", id, step, err);
                    return Err(err.into());
                }
            };

            let fields = &mut record.fields;
            match step {
                Step::Name => fields.name = value,
                Step::Phone => fields.phone = value,
                Step::ChannelUrl => fields.channel_url = value,
                Step::Email => fields.email = value,
                Step::Subject => fields.subject = value,
                Step::None | Step::Done => {}
            }
            record.step = step.next();

            if record.step == Step::Done {
                record.status = Status::PendingReview;
                record.submitted_at = Some(now);
                log::info!("Applicant {} submitted registration for review", id);
                self.registry.save(record.clone());
                (None, Some(record))
            } else {
                self.registry.save(record.clone());
                (Some(StepOutcome::Advanced { next: record.step }), None)
            }
        };

        if let Some(outcome) = outcome {
            return Ok(outcome);
        }
        let record = snapshot.ok_or(RegistrationError::NotFound(id))?;

        // Lookup happens outside the applicant lock.
        let submission = Submission {
            applicant: id,
            username: record.username,
            fields: record.fields,
            submitted_at: now,
            channel: self.directory.review_channel().await,
        };
        self.events.emit(RegistrationEvent::SubmissionReady(submission.clone()));
        Ok(StepOutcome::Submitted(submission))
    }

    /// Moves one step back. Fields already entered are kept.
    pub async fn back(&self, id: ApplicantId, now: DateTime<Utc>) -> RegistrationResult<BackOutcome> {
        let _guard = self.registry.lock(id).await;
        let mut record = self.registry.get(id).ok_or(RegistrationError::NotFound(id))?;
        if !record.status.is_pre_submission() {
            return Err(RegistrationError::InvalidState {
                operation: "go back",
                status: record.status,
            });
        }
        record.touch(now);

        let outcome = match record.step.previous() {
            None => BackOutcome::AlreadyAtFirst,
            Some(Step::None) => {
                record.step = Step::None;
                record.status = Status::Idle;
                BackOutcome::LeftWizard
            }
            Some(step) => {
                record.step = step;
                BackOutcome::Rewound(step)
            }
        };
        self.registry.save(record);
        Ok(outcome)
    }

    /// Abandons the wizard; the applicant is idle again.
    pub async fn cancel(&self, id: ApplicantId, now: DateTime<Utc>) -> RegistrationResult<()> {
        let _guard = self.registry.lock(id).await;
        let mut record = self.registry.get(id).ok_or(RegistrationError::NotFound(id))?;
        if record.status != Status::Collecting {
            return Err(RegistrationError::InvalidState {
                operation: "cancel registration",
                status: record.status,
            });
        }
        record.step = Step::None;
        record.status = Status::Idle;
        record.touch(now);
        self.registry.save(record);
        log::info!("Applicant {} cancelled registration", id);
        Ok(())
    }
}
