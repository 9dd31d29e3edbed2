//! Checkout creation, webhook verification and the transaction ledger

pub mod chapa;
pub mod gateway;
pub mod ledger;
pub mod orchestrator;
pub mod signature;

pub use chapa::ChapaClient;
pub use gateway::{CheckoutRequest, GatewayError, PaymentGateway, Verification, VerifiedStatus};
pub use ledger::{Ledger, TransactionRecord, TransactionStatus};
pub use orchestrator::{Checkout, PaymentConfig, PaymentOrchestrator, WebhookOutcome};
