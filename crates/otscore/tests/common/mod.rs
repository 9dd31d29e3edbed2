//! Common test utilities
//!
//! Shared by the otscore integration tests: an in-memory payment gateway and
//! a fully wired [`Core`].

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use std::sync::{Arc, Mutex};

use otscore::core::config::Settings;
use otscore::payment::gateway::{CheckoutRequest, GatewayError, PaymentGateway, Verification, VerifiedStatus};
use otscore::payment::signature;
use otscore::registration::events::{EventReceiver, NoDirectory, RegistrationEvent};
use otscore::registration::types::ApplicantId;
use otscore::registration::validation::StepInput;
use otscore::Core;

pub const ADMIN: i64 = 1;
pub const REVIEW_CHANNEL: i64 = -1001234567890;
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// What `verify` answers next.
#[derive(Clone, Copy, Debug)]
pub enum VerifyMode {
    Success(Option<f64>),
    NotSuccessful,
    Unreachable,
}

/// In-memory gateway recording every call.
pub struct FakeGateway {
    pub initialized: Mutex<Vec<CheckoutRequest>>,
    pub verified: Mutex<Vec<String>>,
    pub fail_initialize: Mutex<bool>,
    pub verify_mode: Mutex<VerifyMode>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            initialized: Mutex::new(Vec::new()),
            verified: Mutex::new(Vec::new()),
            fail_initialize: Mutex::new(false),
            verify_mode: Mutex::new(VerifyMode::Success(None)),
        }
    }

    pub fn set_verify(&self, mode: VerifyMode) {
        *self.verify_mode.lock().unwrap() = mode;
    }

    pub fn set_fail_initialize(&self, fail: bool) {
        *self.fail_initialize.lock().unwrap() = fail;
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialized.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CheckoutRequest> {
        self.initialized.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<String, GatewayError> {
        if *self.fail_initialize.lock().unwrap() {
            return Err(GatewayError::Status {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        self.initialized.lock().unwrap().push(request.clone());
        Ok(format!("https://checkout.chapa.co/checkout/payment/{}", request.tx_ref))
    }

    async fn verify(&self, tx_ref: &str) -> Result<Verification, GatewayError> {
        self.verified.lock().unwrap().push(tx_ref.to_string());
        match *self.verify_mode.lock().unwrap() {
            VerifyMode::Success(amount) => Ok(Verification {
                status: VerifiedStatus::Success,
                amount,
            }),
            VerifyMode::NotSuccessful => Ok(Verification {
                status: VerifiedStatus::NotSuccessful,
                amount: None,
            }),
            VerifyMode::Unreachable => Err(GatewayError::Malformed("connection reset".to_string())),
        }
    }
}

pub fn test_settings() -> Settings {
    Settings {
        bot_token: SecretString::from("123:test"),
        admin_id: Some(ADMIN),
        review_channel_id: Some(REVIEW_CHANNEL),
        chapa_secret_key: SecretString::from("CHASECK_TEST-key"),
        webhook_secret: SecretString::from(WEBHOOK_SECRET),
        webhook_url: Some("https://ots.example.com".to_string()),
        ..Settings::default()
    }
}

pub struct Harness {
    pub core: Arc<Core>,
    pub gateway: Arc<FakeGateway>,
    pub events: EventReceiver,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let gateway = Arc::new(FakeGateway::new());
        let (core, events) = Core::new(&settings, gateway.clone(), Arc::new(NoDirectory)).unwrap();
        Self {
            core: Arc::new(core),
            gateway,
            events,
        }
    }

    /// Drains every event emitted so far.
    pub fn drain(&mut self) -> Vec<RegistrationEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Walks the wizard from registration to a pending review.
    pub async fn submit_all(&self, id: ApplicantId, now: DateTime<Utc>) {
        self.core.wizard.start(id, None, now).await.unwrap();
        for text in [
            "Jane Doe",
            "0912345678",
            "https://youtube.com/@janedoe",
            "jane@example.com",
            "Mathematics",
        ] {
            self.core.wizard.submit(id, StepInput::text(text), now).await.unwrap();
        }
    }

    /// Registered, submitted and approved.
    pub async fn approved(&self, id: ApplicantId, now: DateTime<Utc>) {
        self.submit_all(id, now).await;
        self.core.approvals.approve(id, ADMIN, now).await.unwrap();
    }
}

pub fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::days(19_800)
}

pub fn signed(body: &str) -> String {
    signature::sign(body.as_bytes(), WEBHOOK_SECRET)
}
