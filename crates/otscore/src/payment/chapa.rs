//! Chapa API client
//!
//! `POST {base}/transaction/initialize` creates a hosted checkout,
//! `GET {base}/transaction/verify/{tx_ref}` reports its outcome. Both use the
//! secret key as a bearer token. Calls are never retried here.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::gateway::{CheckoutRequest, GatewayError, PaymentGateway, Verification, VerifiedStatus};

pub struct ChapaClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: SecretString,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: Option<String>,
    message: Option<serde_json::Value>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct InitializeData {
    checkout_url: Option<String>,
}

#[derive(Deserialize)]
struct VerifyData {
    status: Option<String>,
    amount: Option<serde_json::Value>,
}

fn message_text(message: Option<serde_json::Value>) -> String {
    match message {
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => "no message".to_string(),
    }
}

/// Amounts arrive as numbers or numeric strings.
fn parse_amount(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl ChapaClient {
    pub fn new(base_url: impl Into<String>, secret_key: SecretString, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// The reference is one path segment, escaped, whatever it contains.
    fn verify_url(&self, tx_ref: &str) -> Result<reqwest::Url, GatewayError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| GatewayError::Malformed(format!("invalid base url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Malformed(format!("base url {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["transaction", "verify", tx_ref]);
        Ok(url)
    }

    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, GatewayError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // Chapa answers 400 with a JSON envelope for rejected requests.
            if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
                if envelope.status.as_deref() == Some("failed") {
                    return Err(GatewayError::Rejected(message_text(envelope.message)));
                }
            }
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for ChapaClient {
    async fn initialize(&self, request: &CheckoutRequest) -> Result<String, GatewayError> {
        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(self.secret_key.expose_secret())
            .json(request)
            .send()
            .await?;

        let envelope: Envelope<InitializeData> = Self::read_envelope(response).await?;
        if envelope.status.as_deref() != Some("success") {
            return Err(GatewayError::Rejected(message_text(envelope.message)));
        }
        envelope
            .data
            .and_then(|d| d.checkout_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GatewayError::Malformed("missing data.checkout_url".to_string()))
    }

    async fn verify(&self, tx_ref: &str) -> Result<Verification, GatewayError> {
        let response = self
            .http
            .get(self.verify_url(tx_ref)?)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;

        let envelope: Envelope<VerifyData> = match Self::read_envelope(response).await {
            Ok(envelope) => envelope,
            // Unknown or failed references come back as a 4xx "failed" envelope.
            Err(GatewayError::Rejected(message)) => {
                log::debug!("Chapa verify for {} rejected: {}", tx_ref, message);
                return Ok(Verification {
                    status: VerifiedStatus::NotSuccessful,
                    amount: None,
                });
            }
            Err(e) => return Err(e),
        };

        let data = envelope.data;
        let succeeded = envelope.status.as_deref() == Some("success")
            && data.as_ref().and_then(|d| d.status.as_deref()) == Some("success");
        Ok(Verification {
            status: if succeeded {
                VerifiedStatus::Success
            } else {
                VerifiedStatus::NotSuccessful
            },
            amount: data.as_ref().and_then(|d| d.amount.as_ref()).and_then(parse_amount),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ChapaClient {
        ChapaClient::new(base, SecretString::from("key"), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_verify_url_escapes_reference() {
        let url = client("https://api.chapa.co/v1/").verify_url("tx-1/../refund?x#y").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.chapa.co/v1/transaction/verify/tx-1%2F..%2Frefund%3Fx%23y"
        );
        assert_eq!(url.query(), None);

        let url = client("https://api.chapa.co/v1").verify_url("tx-42-1700000000000").unwrap();
        assert_eq!(url.as_str(), "https://api.chapa.co/v1/transaction/verify/tx-42-1700000000000");
    }

    #[test]
    fn test_parse_amount_accepts_numbers_and_strings() {
        assert_eq!(parse_amount(&serde_json::json!(99)), Some(99.0));
        assert_eq!(parse_amount(&serde_json::json!("149.00")), Some(149.0));
        assert_eq!(parse_amount(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_message_text() {
        assert_eq!(message_text(Some(serde_json::json!("Invalid API key"))), "Invalid API key");
        assert_eq!(message_text(None), "no message");
    }
}
