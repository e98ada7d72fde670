//! HTTP retry helpers for transient errors.
//!
//! Remote sources call [`send_json`] instead of
//! `reqwest::RequestBuilder::send()` so every request gets retried with
//! exponential backoff on timeouts, connection resets, HTTP 429 and 5xx.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retry attempts after the first request.
///
/// With exponential backoff (2s, 4s, 8s) the total wait before giving up
/// is 14 seconds.
const MAX_RETRIES: u32 = 3;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and parses the response body as JSON.
///
/// `build_request` is called once per attempt, since builders are
/// consumed by `.send()`.
///
/// Does **not** retry HTTP 4xx (except 429); those are permanent and
/// surface as [`SourceError::Query`].
///
/// # Errors
///
/// Returns [`SourceError`] if the request still fails after all retries,
/// the server returns a non-retryable status, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, MAX_RETRIES).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!(
            "JSON parse failed.\n  \
             url: {url}\n  \
             status: {status}\n  \
             received: {} bytes\n  \
             parse error: {e}\n  \
             body preview: {preview}",
            text.len(),
        );
        SourceError::Json(e)
    })
}

/// Retry loop: sends the request, retrying transient failures up to
/// `max_retries` times. Returns the first 2xx/3xx response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }
        let retries_left = attempt < max_retries;
        attempt += 1;

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) && retries_left => {
                log::warn!("  transient error: {e}");
                continue;
            }
            Err(e) => return Err(SourceError::Http(e)),
        };

        let status = response.status();

        if is_retryable_status(status) {
            if retries_left {
                log::warn!("  HTTP {status}");
                continue;
            }
            return Err(SourceError::Query {
                message: format!("HTTP {status} after {max_retries} retries"),
            });
        }

        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(BODY_PREVIEW_LEN).collect();
            return Err(SourceError::Query {
                message: format!("HTTP {status}: {preview}"),
            });
        }

        return Ok(response);
    }
}

/// Delay before retry number `attempt` (1-based): 2s, 4s, 8s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

/// 429 Too Many Requests and every 5xx are worth retrying.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
