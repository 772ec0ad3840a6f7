//! HTTP retry helpers for transient errors.
//!
//! Overpass instances are frequently overloaded: they answer with 429 when
//! the per-client slot quota is exhausted and with 504 when the query
//! queue is full. Both are retried with exponential backoff; other client
//! errors are permanent.

use std::time::Duration;

use crate::OsmError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (2s, 4s, 8s, 16s, 32s) the total wait before
/// giving up is 62 seconds.
pub const MAX_RETRIES: u32 = 5;

/// Maximum length of the response body preview included in error messages.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`. A body that fails to download is re-fetched through the same
/// retry loop.
///
/// # Errors
///
/// Returns [`OsmError`] if the request fails after all retries, the server
/// returns a non-retryable status code, or the body cannot be read.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F) -> Result<String, OsmError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(&build_request, MAX_RETRIES).await?;
        let url = response.url().to_string();

        match response.text().await {
            Ok(text) => return Ok(text),
            Err(e) if body_attempt < MAX_RETRIES => {
                body_attempt += 1;
                let delay = backoff(body_attempt);
                log::warn!(
                    "Body read failed (retry {body_attempt}/{MAX_RETRIES}) for {url}, \
                     re-fetching in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!("Body read failed after {MAX_RETRIES} retries for {url}: {e}");
                return Err(OsmError::Http(e));
            }
        }
    }
}

/// Sends the request built by `build_request`, retrying transient failures
/// up to `max_retries` times. Returns the successful response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, OsmError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let response = match build_request().send().await {
            Ok(response) => response,
            Err(e) if is_transient(&e) && attempt < max_retries => {
                log::warn!("  transient error: {e}");
                attempt += 1;
                continue;
            }
            Err(e) => return Err(OsmError::Http(e)),
        };

        let status = response.status();
        match classify(status) {
            Outcome::Success => return Ok(response),
            Outcome::Retry if attempt < max_retries => {
                log::warn!("  HTTP {status}");
                attempt += 1;
            }
            Outcome::Retry => {
                return Err(OsmError::Overpass {
                    message: format!("HTTP {status} after {max_retries} retries"),
                });
            }
            Outcome::Fail => {
                let body = response.text().await.unwrap_or_default();
                return Err(OsmError::Overpass {
                    message: format!("HTTP {status}: {}", preview(&body)),
                });
            }
        }
    }
}

/// What to do with a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Retry,
    Fail,
}

fn classify(status: reqwest::StatusCode) -> Outcome {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Outcome::Retry
    } else if status.is_client_error() {
        Outcome::Fail
    } else {
        Outcome::Success
    }
}

/// 2s, 4s, 8s, ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(6))
}

fn preview(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((end, _)) => &trimmed[..end],
        None => trimmed,
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
