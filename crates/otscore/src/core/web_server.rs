//! Public HTTP server for the payment gateway.
//!
//! Serves the payment webhook at `POST /verify`, the post-checkout page at
//! `GET /success` and a liveness text at `GET /`. Runs on PORT (default 3000)
//! next to the Telegram dispatcher.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::core::error::AppResult;
use crate::payment::orchestrator::PaymentOrchestrator;
use crate::payment::signature::SIGNATURE_HEADERS;

pub const HEALTH_TEXT: &str = "✅ Bot is running!";

/// Shared state for the web server.
#[derive(Clone)]
struct WebState {
    payments: Arc<PaymentOrchestrator>,
}

pub fn router(payments: Arc<PaymentOrchestrator>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/success", get(success_handler))
        .route("/verify", post(verify_handler))
        .with_state(WebState { payments })
}

/// Start the public web server.
pub async fn start_web_server(port: u16, payments: Arc<PaymentOrchestrator>) -> AppResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(payments);

    log::info!("Starting web server on http://{}", addr);
    log::info!("  /         - Liveness text");
    log::info!("  /verify   - Payment webhook (POST)");
    log::info!("  /success  - Checkout return page");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, HEALTH_TEXT)
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn success_handler() -> Html<&'static str> {
    Html(SUCCESS_PAGE)
}

fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

async fn verify_handler(State(state): State<WebState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let outcome = state
        .payments
        .handle_webhook(&body, signature_header(&headers), Utc::now())
        .await;
    let status = StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    log::debug!("Webhook answered {} ({})", status, outcome.body());
    (status, outcome.body())
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Payment received</title>
<style>
  body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; background: #f4f6f8;
         display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; }
  .card { background: #fff; border-radius: 12px; padding: 32px 40px; max-width: 420px;
          box-shadow: 0 4px 18px rgba(0,0,0,.08); text-align: center; }
  h1 { font-size: 1.4rem; margin: 0 0 12px; }
  p { color: #555; line-height: 1.5; }
</style>
</head>
<body>
<div class="card">
  <h1>✅ Payment received</h1>
  <p>Thank you! Your payment is being confirmed. You will get a message in Telegram
  as soon as your account is active.</p>
  <p>You can close this page and return to the bot.</p>
</div>
</body>
</html>
"#;
