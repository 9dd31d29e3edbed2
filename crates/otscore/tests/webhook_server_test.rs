//! HTTP surface of the webhook server, driven through the axum router

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use common::{signed, t0, Harness, VerifyMode};
use otscore::core::web_server::{router, HEALTH_TEXT};
use otscore::registration::types::{ApplicantId, Status};

fn app(h: &Harness) -> Router {
    router(h.core.payments.clone())
}

fn webhook(body: &str, signature: Option<(&str, String)>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/verify")
        .header("content-type", "application/json");
    if let Some((name, value)) = signature {
        builder = builder.header(name, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn root_reports_liveness() {
    let h = Harness::new();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(&h), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, HEALTH_TEXT);
}

#[tokio::test]
async fn success_page_is_html() {
    let h = Harness::new();
    let request = Request::builder().uri("/success").body(Body::empty()).unwrap();
    let response = app(&h).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"), "{content_type}");
}

#[tokio::test]
async fn unsigned_webhook_is_401() {
    let h = Harness::new();
    let (status, _) = send(app(&h), webhook(r#"{"tx_ref":"tx-1-001"}"#, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn both_signature_headers_are_accepted() {
    let h = Harness::new();
    h.gateway.set_verify(VerifyMode::NotSuccessful);
    let body = r#"{"tx_ref":"tx-1-001"}"#;

    for header in ["Chapa-Signature", "x-chapa-signature"] {
        let (status, text) = send(app(&h), webhook(body, Some((header, signed(body))))).await;
        assert_eq!(status, StatusCode::OK, "{header}");
        assert_eq!(text, "payment_not_successful");
    }
}

#[tokio::test]
async fn webhook_without_reference_is_400() {
    let h = Harness::new();
    let body = r#"{"status":"success"}"#;
    let (status, _) = send(app(&h), webhook(body, Some(("Chapa-Signature", signed(body))))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_gateway_is_502_so_the_provider_retries() {
    let h = Harness::new();
    let id = ApplicantId(1);
    h.approved(id, t0()).await;
    h.gateway.set_verify(VerifyMode::Unreachable);

    let body = r#"{"tx_ref":"tx-1-001"}"#;
    let (status, _) = send(app(&h), webhook(body, Some(("Chapa-Signature", signed(body))))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(h.core.registry.get(id).map(|r| r.status), Some(Status::Approved));

    h.gateway.set_verify(VerifyMode::Success(None));
    let (status, text) = send(app(&h), webhook(body, Some(("Chapa-Signature", signed(body))))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ok");
    let record = h.core.registry.get(id).unwrap();
    assert_eq!(record.status, Status::PaymentVerified);
    // No amount from the gateway and no ledger entry: priced by the fee policy.
    assert_eq!(record.paid_amount, Some(99.0));
}

#[tokio::test]
async fn unknown_applicant_is_404() {
    let h = Harness::new();
    let body = r#"{"tx_ref":"tx-999-001"}"#;
    let (status, _) = send(app(&h), webhook(body, Some(("Chapa-Signature", signed(body))))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let body = r#"{"tx_ref":"chapa-opaque-ref"}"#;
    let (status, _) = send(app(&h), webhook(body, Some(("Chapa-Signature", signed(body))))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn replayed_webhook_answers_already_processed() {
    let h = Harness::new();
    let id = ApplicantId(1);
    h.approved(id, t0()).await;

    let body = r#"{"trx_ref":"tx-1-001","status":"success"}"#;
    let (status, text) = send(app(&h), webhook(body, Some(("Chapa-Signature", signed(body))))).await;
    assert_eq!((status, text.as_str()), (StatusCode::OK, "ok"));
    let (status, text) = send(app(&h), webhook(body, Some(("Chapa-Signature", signed(body))))).await;
    assert_eq!((status, text.as_str()), (StatusCode::OK, "already_processed"));
    assert_eq!(h.gateway.verified.lock().unwrap().len(), 1);
}
