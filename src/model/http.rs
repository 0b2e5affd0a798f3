//! Shared reqwest plumbing for the HTTP backends.

use super::Attempt;
use crate::error::GatewayError;
use reqwest::StatusCode;
use std::time::Duration;

const BODY_SNIPPET_CHARS: usize = 200;

pub(crate) fn build_client(backend: &str, timeout_secs: u64) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GatewayError::ProviderNotConfigured {
            provider: backend.to_string(),
            hint: format!("HTTP client could not be built: {e}"),
        })
}

/// A request that never got a response.
pub(crate) fn send_error(backend: &str, e: reqwest::Error) -> Attempt {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        Attempt::Fatal(GatewayError::Connection {
            backend: backend.to_string(),
            detail: e.to_string(),
        })
    } else {
        Attempt::Fatal(GatewayError::UnexpectedResponse {
            backend: backend.to_string(),
            detail: e.to_string(),
        })
    }
}

/// Map a non-2xx status to an [`Attempt`]; `None` for success.
pub(crate) fn classify_status(backend: &str, status: StatusCode, body: &str) -> Option<Attempt> {
    if status.is_success() {
        return None;
    }
    let detail = format!("HTTP {status}: {}", snippet(body));
    Some(match status {
        StatusCode::TOO_MANY_REQUESTS => Attempt::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Attempt::Fatal(GatewayError::Auth {
            backend: backend.to_string(),
            detail,
        }),
        // Every other status fails the block only.
        _ => Attempt::Rejected(detail),
    })
}

/// POST `body` and decode the JSON reply, or return the attempt outcome that
/// stopped us.
pub(crate) async fn post_json(
    backend: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, Attempt> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| send_error(backend, e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(classify_status(backend, status, &text)
            .unwrap_or_else(|| Attempt::Rejected(format!("HTTP {status}"))));
    }

    response.json().await.map_err(|e| {
        Attempt::Fatal(GatewayError::UnexpectedResponse {
            backend: backend.to_string(),
            detail: format!("invalid JSON body: {e}"),
        })
    })
}

pub(crate) fn unexpected(backend: &str, detail: impl Into<String>) -> Attempt {
    Attempt::Fatal(GatewayError::UnexpectedResponse {
        backend: backend.to_string(),
        detail: detail.into(),
    })
}

fn snippet(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > BODY_SNIPPET_CHARS {
        let cut: String = body.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{cut}\u{2026}")
    } else {
        body.to_string()
    }
}
