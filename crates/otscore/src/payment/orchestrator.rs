//! Checkout creation and webhook confirmation

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::gateway::{CheckoutRequest, Customization, PaymentGateway, VerifiedStatus};
use super::ledger::{applicant_from_tx_ref, make_tx_ref, Ledger, TransactionRecord, TransactionStatus};
use super::signature;
use crate::core::error::{RegistrationError, RegistrationResult};
use crate::registration::events::{EventBus, PaymentReceipt, RegistrationEvent};
use crate::registration::fee::{commission, FeeSchedule};
use crate::registration::registry::Registry;
use crate::registration::types::{ApplicantId, ApplicantRecord, Status};

const CHECKOUT_TITLE: &str = "OTS Teacher Registration";
const DEFAULT_LAST_NAME: &str = "Teacher";

pub struct PaymentConfig {
    pub fees: FeeSchedule,
    pub teacher_share: f64,
    pub webhook_secret: SecretString,
    pub callback_url: String,
    pub return_url: String,
    pub placeholder_email: String,
}

/// A hosted checkout the applicant can pay through.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub tx_ref: String,
    pub checkout_url: String,
    pub amount: f64,
    pub currency: String,
    /// An outstanding checkout was handed out again.
    pub reused: bool,
}

/// What a webhook delivery did. Maps one-to-one onto the HTTP answer.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    InvalidSignature,
    MissingReference,
    AlreadyProcessed,
    NotSuccessful,
    GatewayUnavailable,
    UnknownApplicant,
    /// Verified payment for a record that is not awaiting one.
    Ignored,
    Confirmed(PaymentReceipt),
}

impl WebhookOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookOutcome::InvalidSignature => 401,
            WebhookOutcome::MissingReference => 400,
            WebhookOutcome::GatewayUnavailable => 502,
            WebhookOutcome::UnknownApplicant => 404,
            WebhookOutcome::AlreadyProcessed
            | WebhookOutcome::NotSuccessful
            | WebhookOutcome::Ignored
            | WebhookOutcome::Confirmed(_) => 200,
        }
    }

    pub fn body(&self) -> &'static str {
        match self {
            WebhookOutcome::InvalidSignature => "invalid signature",
            WebhookOutcome::MissingReference => "No transaction reference",
            WebhookOutcome::AlreadyProcessed => "already_processed",
            WebhookOutcome::NotSuccessful => "payment_not_successful",
            WebhookOutcome::GatewayUnavailable => "verification unavailable",
            WebhookOutcome::UnknownApplicant => "user not found",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::Confirmed(_) => "ok",
        }
    }
}

/// `99` for whole amounts, `99.50` otherwise.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
    }
}

/// Reads `tx_ref` (or its `trx_ref` alias) from a webhook body.
pub fn extract_tx_ref(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["tx_ref", "trx_ref"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().all(is_reference_char))
        .map(str::to_string)
}

/// Chapa references are letters, digits, `-`, `_` and `.`.
fn is_reference_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

pub struct PaymentOrchestrator {
    registry: Arc<Registry>,
    ledger: Arc<Ledger>,
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentConfig,
    events: EventBus,
}

impl PaymentOrchestrator {
    pub fn new(
        registry: Arc<Registry>,
        ledger: Arc<Ledger>,
        gateway: Arc<dyn PaymentGateway>,
        config: PaymentConfig,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            ledger,
            gateway,
            config,
            events,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.config.fees
    }

    fn checkout_request(&self, record: &ApplicantRecord, amount: f64, tx_ref: &str) -> CheckoutRequest {
        let fields = &record.fields;
        let name = fields.name.clone().unwrap_or_default();
        CheckoutRequest {
            amount: format_amount(amount),
            currency: self.config.fees.currency.clone(),
            email: fields
                .email
                .clone()
                .unwrap_or_else(|| self.config.placeholder_email.clone()),
            first_name: fields.first_name().unwrap_or(DEFAULT_LAST_NAME).to_string(),
            last_name: fields.last_name().unwrap_or_else(|| DEFAULT_LAST_NAME.to_string()),
            tx_ref: tx_ref.to_string(),
            callback_url: self.config.callback_url.clone(),
            return_url: self.config.return_url.clone(),
            customization: Customization {
                title: CHECKOUT_TITLE.to_string(),
                description: format!("Registration fee for {}", name),
            },
        }
    }

    /// Creates a checkout for an approved applicant.
    ///
    /// An applicant already in `PendingPayment` gets the outstanding checkout
    /// back. A gateway failure leaves the record as it was.
    pub async fn initiate(&self, id: ApplicantId, now: DateTime<Utc>) -> RegistrationResult<Checkout> {
        let _guard = self.registry.lock(id).await;
        let mut record = self.registry.get(id).ok_or(RegistrationError::NotFound(id))?;

        match record.status {
            Status::PendingPayment => {
                let outstanding = record
                    .transaction_ref
                    .as_deref()
                    .and_then(|r| self.ledger.get(r))
                    .filter(|t| t.status == TransactionStatus::Created);
                if let Some(t) = outstanding {
                    log::debug!("Reusing checkout {} for applicant {}", t.tx_ref, id);
                    return Ok(Checkout {
                        tx_ref: t.tx_ref,
                        checkout_url: t.checkout_url,
                        amount: t.amount,
                        currency: self.config.fees.currency.clone(),
                        reused: true,
                    });
                }
            }
            Status::Approved => {}
            status => {
                return Err(RegistrationError::InvalidState {
                    operation: "initiate payment",
                    status,
                })
            }
        }

        let mut priced = record.clone();
        let fee = self.config.fees.charge(&mut priced, now);
        let tx_ref = make_tx_ref(id, now);
        let request = self.checkout_request(&priced, fee.amount, &tx_ref);

        let checkout_url = match self.gateway.initialize(&request).await {
            Ok(url) => url,
            Err(e) => {
                log::error!("Checkout initialization failed for applicant {}: {}", id, e);
                return Err(e.into());
            }
        };

        record = priced;
        record.transaction_ref = Some(tx_ref.clone());
        record.status = Status::PendingPayment;
        record.touch(now);
        self.registry.save(record);
        self.ledger.record(TransactionRecord {
            tx_ref: tx_ref.clone(),
            applicant: id,
            amount: fee.amount,
            checkout_url: checkout_url.clone(),
            created_at: now,
            status: TransactionStatus::Created,
        });
        log::info!(
            "Checkout {} created for applicant {} ({} {})",
            tx_ref,
            id,
            fee.amount,
            self.config.fees.currency
        );

        Ok(Checkout {
            tx_ref,
            checkout_url,
            amount: fee.amount,
            currency: self.config.fees.currency.clone(),
            reused: false,
        })
    }

    /// Processes one webhook delivery. Replays never confirm twice.
    pub async fn handle_webhook(&self, body: &[u8], signature: Option<&str>, now: DateTime<Utc>) -> WebhookOutcome {
        if !signature::verify(body, signature, self.config.webhook_secret.expose_secret()) {
            log::warn!("Rejected webhook with invalid signature");
            return WebhookOutcome::InvalidSignature;
        }

        let Some(tx_ref) = extract_tx_ref(body) else {
            log::warn!("Webhook without transaction reference");
            return WebhookOutcome::MissingReference;
        };

        if self.ledger.is_processed(&tx_ref) {
            log::debug!("Webhook replay for {}", tx_ref);
            return WebhookOutcome::AlreadyProcessed;
        }

        let verification = match self.gateway.verify(&tx_ref).await {
            Ok(v) => v,
            Err(e) => {
                log::error!("Verification of {} failed: {}", tx_ref, e);
                return WebhookOutcome::GatewayUnavailable;
            }
        };
        if verification.status != VerifiedStatus::Success {
            log::info!("Payment {} not successful", tx_ref);
            return WebhookOutcome::NotSuccessful;
        }

        let transaction = self.ledger.get(&tx_ref);
        let Some(applicant) = transaction
            .as_ref()
            .map(|t| t.applicant)
            .or_else(|| applicant_from_tx_ref(&tx_ref))
        else {
            log::warn!("No applicant for verified payment {}", tx_ref);
            return WebhookOutcome::UnknownApplicant;
        };

        let _guard = self.registry.lock(applicant).await;
        let Some(mut record) = self.registry.get(applicant) else {
            log::warn!("Applicant {} of payment {} not found", applicant, tx_ref);
            return WebhookOutcome::UnknownApplicant;
        };
        match record.status {
            Status::PaymentVerified => return WebhookOutcome::AlreadyProcessed,
            Status::Approved | Status::PendingPayment => {}
            status => {
                log::warn!(
                    "Verified payment {} for applicant {} in status {}, ignoring",
                    tx_ref,
                    applicant,
                    status
                );
                return WebhookOutcome::Ignored;
            }
        }
        if !self.ledger.claim(&tx_ref) {
            return WebhookOutcome::AlreadyProcessed;
        }

        let amount = verification
            .amount
            .or_else(|| transaction.as_ref().map(|t| t.amount))
            .unwrap_or_else(|| self.config.fees.quote(&record, now).amount);
        let credited = commission(amount, self.config.teacher_share);

        record.status = Status::PaymentVerified;
        record.transaction_ref = Some(tx_ref.clone());
        record.paid_amount = Some(amount);
        record.commission = Some(credited);
        record.paid_at = Some(now);
        record.touch(now);
        self.registry.save(record);
        self.ledger.mark_verified(&tx_ref);

        log::info!(
            "Payment {} confirmed for applicant {}: {} {}, commission {}",
            tx_ref,
            applicant,
            amount,
            self.config.fees.currency,
            credited
        );
        let receipt = PaymentReceipt {
            applicant,
            tx_ref,
            amount,
            commission: credited,
            currency: self.config.fees.currency.clone(),
            paid_at: now,
        };
        self.events.emit(RegistrationEvent::PaymentConfirmed(receipt.clone()));
        WebhookOutcome::Confirmed(receipt)
    }
}
