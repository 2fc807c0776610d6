//! Edge relay endpoint.
//!
//! The upstream API sends no CORS headers, so browsers cannot call it
//! directly. This stateless actix-web service accepts `?url=<target>`,
//! fetches the target with bounded retry and timeout, and mirrors the body
//! back with permissive CORS headers and a short cache lifetime.

use std::collections::HashMap;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, web};
use anyhow::{Result, anyhow};
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderValue, USER_AGENT};
use serde_json::json;
use tracing::{info, warn};

use crate::fetch::{BasicClient, HttpClient};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
const RELAY_USER_AGENT: &str = "abfahrten-relay/1.0";

/// Status codes worth another attempt; everything else passes through
/// as-is on the attempt it arrived.
const RETRYABLE_STATUS: [u16; 4] = [403, 500, 502, 503];

/// Upstream reply, ready to mirror to the caller.
#[derive(Debug)]
pub struct RelayedResponse {
    pub status: u16,
    pub body: String,
    pub attempts: u32,
}

/// Fetches `url` with up to [`MAX_ATTEMPTS`] attempts, exponential backoff
/// (200 ms, then 400 ms) before retries, and a 10 s per-attempt timeout.
///
/// 2xx — or any status outside [`RETRYABLE_STATUS`] — returns immediately.
#[tracing::instrument(skip(client))]
pub async fn fetch_with_retry<C: HttpClient>(client: &C, url: &str) -> Result<RelayedResponse> {
    let mut last_error: Option<anyhow::Error> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        if attempt > 1 {
            let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 2);
            tokio::time::sleep(delay).await;
        }

        let mut req = reqwest::Request::new(
            Method::GET,
            url.parse().map_err(|e| anyhow!("invalid target url: {e}"))?,
        );
        req.headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static(RELAY_USER_AGENT));
        req.headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        *req.timeout_mut() = Some(UPSTREAM_TIMEOUT);

        match client.execute(req).await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() || !RETRYABLE_STATUS.contains(&status.as_u16()) {
                    match resp.text().await {
                        Ok(body) => {
                            return Ok(RelayedResponse {
                                status: status.as_u16(),
                                body,
                                attempts: attempt,
                            });
                        }
                        Err(e) => last_error = Some(e.into()),
                    }
                } else {
                    warn!(attempt, status = status.as_u16(), "Upstream returned retryable status");
                    last_error = Some(anyhow!("HTTP {status}"));
                }
            }
            Err(e) => {
                warn!(attempt, error = %e, "Upstream request failed");
                last_error = Some(e.into());
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("all retry attempts failed")))
}

fn cors_json(status: StatusCode, body: serde_json::Value) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .json(body)
}

/// CORS preflight: permissive headers, no body.
async fn preflight() -> HttpResponse {
    HttpResponse::NoContent()
        .insert_header(("Access-Control-Allow-Origin", "*"))
        .insert_header(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .insert_header(("Access-Control-Allow-Headers", "Content-Type"))
        .finish()
}

/// Relay handler: requires `?url=`, mirrors the upstream body and status.
async fn relay(query: web::Query<HashMap<String, String>>) -> HttpResponse {
    let Some(target) = query.get("url") else {
        return cors_json(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Missing url parameter", "type": "bad_request" }),
        );
    };

    match fetch_with_retry(&BasicClient::new(), target).await {
        Ok(relayed) => {
            let status = StatusCode::from_u16(relayed.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status)
                .insert_header(("Content-Type", "application/json"))
                .insert_header(("Access-Control-Allow-Origin", "*"))
                .insert_header(("Cache-Control", "public, max-age=30"))
                .insert_header(("X-Proxy-Attempts", relayed.attempts.to_string()))
                .body(relayed.body)
        }
        Err(e) => cors_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": e.to_string(), "type": "proxy_error" }),
        ),
    }
}

/// Mounts the relay routes: OPTIONS preflight plus the catch-all relay.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/",
        web::route()
            .guard(actix_web::guard::Options())
            .to(preflight),
    )
    .route("/", web::route().to(relay));
}

/// Runs the relay server until shutdown.
pub async fn run(bind: &str) -> Result<()> {
    info!(bind, "Relay listening");
    HttpServer::new(|| App::new().configure(configure))
        .bind(bind)?
        .run()
        .await?;
    Ok(())
}
