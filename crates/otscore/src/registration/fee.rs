//! Registration fee policy
//!
//! The fee is the standard amount unless the applicant was rejected before or
//! more than `penalty_after` has passed since registration started.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::ApplicantRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    pub standard: f64,
    pub penalty: f64,
    pub currency: String,
    pub penalty_after: Duration,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            standard: 99.0,
            penalty: 149.0,
            currency: "ETB".to_string(),
            penalty_after: Duration::hours(24),
        }
    }
}

/// Amount due at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: f64,
    pub penalty_applied: bool,
}

impl FeeSchedule {
    /// Computes the fee without touching the record.
    pub fn quote(&self, record: &ApplicantRecord, now: DateTime<Utc>) -> Fee {
        let late = now.signed_duration_since(record.created_at) > self.penalty_after;
        let penalty_applied = record.rejected_before || late;
        Fee {
            amount: if penalty_applied { self.penalty } else { self.standard },
            penalty_applied,
        }
    }

    /// Computes the fee and records whether the penalty applied.
    pub fn charge(&self, record: &mut ApplicantRecord, now: DateTime<Utc>) -> Fee {
        let fee = self.quote(record, now);
        record.penalty_applied = fee.penalty_applied;
        fee
    }
}

/// Commission credited for a verified payment, rounded to cents.
pub fn commission(amount: f64, share: f64) -> f64 {
    (amount * share * 100.0).round() / 100.0
}
