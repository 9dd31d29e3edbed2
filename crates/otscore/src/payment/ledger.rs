//! Transaction ledger and the processed-reference set

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

use crate::registration::types::ApplicantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TransactionStatus {
    Created,
    Verified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tx_ref: String,
    pub applicant: ApplicantId,
    pub amount: f64,
    pub checkout_url: String,
    pub created_at: DateTime<Utc>,
    pub status: TransactionStatus,
}

/// Builds `tx-{applicant}-{unix millis}`.
pub fn make_tx_ref(applicant: ApplicantId, now: DateTime<Utc>) -> String {
    format!("tx-{}-{}", applicant, now.timestamp_millis())
}

/// Applicant id embedded in a reference built by [`make_tx_ref`].
pub fn applicant_from_tx_ref(tx_ref: &str) -> Option<ApplicantId> {
    let rest = tx_ref.strip_prefix("tx-")?;
    let (id, _millis) = rest.rsplit_once('-')?;
    id.parse().ok()
}

#[derive(Default)]
pub struct Ledger {
    transactions: DashMap<String, TransactionRecord>,
    processed: DashSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, transaction: TransactionRecord) {
        self.transactions.insert(transaction.tx_ref.clone(), transaction);
    }

    pub fn get(&self, tx_ref: &str) -> Option<TransactionRecord> {
        self.transactions.get(tx_ref).map(|t| t.value().clone())
    }

    pub fn is_processed(&self, tx_ref: &str) -> bool {
        self.processed.contains(tx_ref)
    }

    /// Claims `tx_ref` for finalization. Only the first caller gets `true`.
    pub fn claim(&self, tx_ref: &str) -> bool {
        self.processed.insert(tx_ref.to_string())
    }

    pub fn mark_verified(&self, tx_ref: &str) {
        if let Some(mut t) = self.transactions.get_mut(tx_ref) {
            t.status = TransactionStatus::Verified;
        }
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}
