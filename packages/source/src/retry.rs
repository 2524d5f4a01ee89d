//! HTTP retry helpers for transient errors.
//!
//! Archive and listing fetches go through [`send_bytes`] or [`send_json`]
//! instead of calling `reqwest::RequestBuilder::send()` directly, so every
//! request gets automatic retry with exponential backoff for transient
//! failures (timeouts, connection resets, server errors, rate limiting).

use std::time::Duration;

use crate::SourceError;

/// Sends an HTTP request and returns the raw response body.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// # Retry behaviour
///
/// Retries up to `max_retries` times with exponential backoff (2s, 4s, 8s,
/// ...) on connection errors, timeouts, HTTP 429, and HTTP 5xx. Does **not**
/// retry other HTTP 4xx — these are permanent. HTTP 404 is returned as
/// `Ok(None)`: a month the source has not published yet is an expected
/// condition, not a failure.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries or the
/// server returns a non-retryable status code.
#[allow(clippy::future_not_send)]
pub async fn send_bytes<F>(build_request: F, max_retries: u32) -> Result<Option<Vec<u8>>, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let Some(response) = send_inner(&build_request, max_retries).await? else {
        return Ok(None);
    };

    let url = response.url().to_string();

    match response.bytes().await {
        Ok(bytes) => Ok(Some(bytes.to_vec())),
        Err(e) => {
            log::error!("Response body read failed for {url}: {e}");
            Err(SourceError::Http(e))
        }
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// Same retry behaviour as [`send_bytes`]. A 404 response yields
/// `Ok(None)`.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    build_request: F,
    max_retries: u32,
) -> Result<Option<serde_json::Value>, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let Some(bytes) = send_bytes(build_request, max_retries).await? else {
        return Ok(None);
    };

    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Core retry loop shared by [`send_bytes`] and [`send_json`].
///
/// Sends the request built by `build_request`, retrying on transient errors
/// up to `max_retries` times with exponential backoff. Returns the
/// successful [`reqwest::Response`], or `None` for HTTP 404.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<Option<reqwest::Response>, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error: Option<SourceError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt); // 2s, 4s, 8s
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        let result = build_request().send().await;

        match result {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(SourceError::Http(e));
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                // 404 — the period genuinely has no data
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }

                // 429 Too Many Requests — always retry
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    if attempt < max_retries {
                        log::warn!("  HTTP 429 (rate limited)");
                        last_error = Some(SourceError::Status { status });
                        continue;
                    }
                    return Err(SourceError::Status { status });
                }

                // 5xx Server Error — retry
                if status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} (server error)");
                        last_error = Some(SourceError::Status { status });
                        continue;
                    }
                    return Err(SourceError::Status { status });
                }

                // 4xx Client Error (not 404/429) — permanent, don't retry
                if status.is_client_error() {
                    return Err(SourceError::Status { status });
                }

                return Ok(Some(response));
            }
        }
    }

    // Should be unreachable, but in case the loop exits without returning:
    Err(last_error.unwrap_or(SourceError::Archive {
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}
