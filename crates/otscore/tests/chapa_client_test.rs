//! Chapa client against a mocked API (wiremock)

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use otscore::payment::chapa::ChapaClient;
use otscore::payment::gateway::{CheckoutRequest, Customization, GatewayError, PaymentGateway, VerifiedStatus};

fn client(server: &MockServer) -> ChapaClient {
    ChapaClient::new(
        server.uri(),
        SecretString::from("CHASECK_TEST-key"),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn request() -> CheckoutRequest {
    CheckoutRequest {
        amount: "99".to_string(),
        currency: "ETB".to_string(),
        email: "jane@example.com".to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        tx_ref: "tx-42-1700000000000".to_string(),
        callback_url: "https://ots.example.com/verify".to_string(),
        return_url: "https://ots.example.com/success".to_string(),
        customization: Customization {
            title: "OTS Teacher Registration".to_string(),
            description: "Registration fee for Jane Doe".to_string(),
        },
    }
}

#[tokio::test]
async fn initialize_returns_checkout_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(header("authorization", "Bearer CHASECK_TEST-key"))
        .and(body_partial_json(json!({
            "amount": "99",
            "tx_ref": "tx-42-1700000000000",
            "customization": { "title": "OTS Teacher Registration" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hosted Link",
            "status": "success",
            "data": { "checkout_url": "https://checkout.chapa.co/checkout/payment/abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server).initialize(&request()).await.unwrap();
    assert_eq!(url, "https://checkout.chapa.co/checkout/payment/abc");
}

#[tokio::test]
async fn initialize_failure_envelope_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Invalid API Key",
            "status": "failed",
            "data": null
        })))
        .mount(&server)
        .await;

    let err = client(&server).initialize(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(ref m) if m == "Invalid API Key"), "{err}");
}

#[tokio::test]
async fn initialize_server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server).initialize(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 503, .. }), "{err}");
}

#[tokio::test]
async fn initialize_without_checkout_url_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success", "data": {} })))
        .mount(&server)
        .await;

    let err = client(&server).initialize(&request()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Malformed(_)), "{err}");
}

#[tokio::test]
async fn verify_success_reports_amount() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-42-1700000000000"))
        .and(header("authorization", "Bearer CHASECK_TEST-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Payment details",
            "status": "success",
            "data": { "status": "success", "amount": "149.00", "currency": "ETB" }
        })))
        .mount(&server)
        .await;

    let verification = client(&server).verify("tx-42-1700000000000").await.unwrap();
    assert_eq!(verification.status, VerifiedStatus::Success);
    assert_eq!(verification.amount, Some(149.0));
}

#[tokio::test]
async fn verify_pending_is_not_successful() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-1-001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": { "status": "pending", "amount": 99 }
        })))
        .mount(&server)
        .await;

    let verification = client(&server).verify("tx-1-001").await.unwrap();
    assert_eq!(verification.status, VerifiedStatus::NotSuccessful);
}

#[tokio::test]
async fn verify_unknown_reference_is_not_successful() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-1-404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Invalid transaction or Transaction not found",
            "status": "failed",
            "data": null
        })))
        .mount(&server)
        .await;

    let verification = client(&server).verify("tx-1-404").await.unwrap();
    assert_eq!(verification.status, VerifiedStatus::NotSuccessful);
    assert_eq!(verification.amount, None);
}

#[tokio::test]
async fn verify_server_error_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-1-500"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server).verify("tx-1-500").await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 500, .. }), "{err}");
}
