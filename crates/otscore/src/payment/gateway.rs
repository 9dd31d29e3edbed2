//! Payment gateway contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway answered {status}: {body}")]
    Status { status: u16, body: String },

    /// The gateway understood the request and said no.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    #[error("unexpected gateway response: {0}")]
    Malformed(String),
}

/// Customization block shown on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customization {
    pub title: String,
    pub description: String,
}

/// Body of a checkout initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub amount: String,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
    pub customization: Customization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedStatus {
    Success,
    /// Pending, failed or anything else the gateway reports.
    NotSuccessful,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub status: VerifiedStatus,
    /// Amount the gateway reports, when it reports one.
    pub amount: Option<f64>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted checkout and returns its URL.
    async fn initialize(&self, request: &CheckoutRequest) -> Result<String, GatewayError>;

    async fn verify(&self, tx_ref: &str) -> Result<Verification, GatewayError>;
}
