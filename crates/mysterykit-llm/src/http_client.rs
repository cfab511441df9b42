//! Shared HTTP plumbing for the HTTP-based backends.
//!
//! There is no retry here: a failed attempt is reported straight back so the
//! provider chain can move on to the next provider.

use std::time::Duration;

use mysterykit_utils::error::ProviderError;
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::debug;

/// Longest slice of a response body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Sampling parameters sent with every request
#[derive(Debug, Clone)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for HttpParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.8,
        }
    }
}

pub(crate) struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the TLS backend cannot be
    /// initialised.
    pub(crate) fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ProviderError::Misconfiguration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client })
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send `request` with `timeout` and classify the outcome.
    pub(crate) async fn execute(
        &self,
        request: RequestBuilder,
        timeout: Duration,
        provider: &str,
    ) -> Result<Response, ProviderError> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout { duration: timeout }
            } else {
                ProviderError::Transport(format!("{provider}: {}", without_url(&e)))
            }
        })?;

        let status = response.status();
        debug!(provider = provider, status = status.as_u16(), "HTTP response received");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = truncate_body(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Auth(format!("HTTP {}: {message}", status.as_u16()))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::Quota(message),
        _ => ProviderError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push('…');
    out
}

// reqwest errors embed the request URL, which may carry query-string keys.
fn without_url(err: &reqwest::Error) -> String {
    let rendered = err.to_string();
    match err.url() {
        Some(url) => rendered.replace(url.as_str(), "<url>"),
        None => rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_statuses() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "bad key"),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            ProviderError::Auth(_)
        ));
    }

    #[test]
    fn test_classify_quota_and_server_errors() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ProviderError::Quota(msg) if msg == "slow down"
        ));
        match classify_status(StatusCode::BAD_GATEWAY, "upstream") {
            ProviderError::Http { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream");
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        match classify_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ProviderError::Http { message, .. } => {
                assert_eq!(message.chars().count(), MAX_ERROR_BODY_CHARS + 1);
                assert!(message.ends_with('…'));
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }
}
