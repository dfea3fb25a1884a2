//! reqwest-backed HTTP transport
//!
//! Sends requests with rotating browser-like headers, retries throttled and
//! failing upstreams with exponential backoff, and skips reading bodies of
//! binary content.

use crate::error::ScrapeError;
use crate::fetchers::{HttpTransport, RawResponse};
use crate::types::HttpMethod;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER, UPGRADE_INSECURE_REQUESTS,
    USER_AGENT,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Real browser user agents rotated across requests
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.8,de;q=0.5",
    "en,en-US;q=0.9",
];

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf;q=0.8,*/*;q=0.7";

/// Status codes worth retrying
const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Upper bound for a server-provided Retry-After
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Upper bound for a page body; larger bodies are truncated
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound for a downloaded document
const MAX_DOCUMENT_BYTES: usize = 200 * 1024 * 1024;

/// Whole-request timeout for document downloads
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Retry behaviour for throttled or failing upstreams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(after) = retry_after {
            return after.min(MAX_RETRY_AFTER);
        }
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}

/// HTTP transport built on a pooled reqwest client
pub struct ReqwestTransport {
    client: reqwest::Client,
    user_agent: Option<String>,
    retry: RetryPolicy,
    body_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the given per-request timeout
    ///
    /// With `user_agent` unset, every request picks a random browser agent.
    pub fn new(
        timeout: Duration,
        retry: RetryPolicy,
        user_agent: Option<String>,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(ScrapeError::ClientBuildError)?;

        Ok(Self {
            client,
            user_agent,
            retry,
            body_timeout: timeout,
        })
    }

    /// Headers for one request, randomized unless a user agent is pinned
    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let agent = match self.user_agent.as_deref() {
            Some(ua) => ua,
            None => IMPERSONATE_USER_AGENTS[fastrand::usize(..IMPERSONATE_USER_AGENTS.len())],
        };
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(agent)
                .unwrap_or_else(|_| HeaderValue::from_static(crate::DEFAULT_USER_AGENT)),
        );

        let language = ACCEPT_LANGUAGES[fastrand::usize(..ACCEPT_LANGUAGES.len())];
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(language));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers
    }

    async fn into_raw(&self, method: HttpMethod, response: reqwest::Response) -> RawResponse {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let skip_body = method == HttpMethod::Head
            || content_type
                .as_deref()
                .map(is_binary_content_type)
                .unwrap_or(false);

        let body = if skip_body {
            Bytes::new()
        } else {
            let (body, truncated) =
                read_body_with_timeout(response, self.body_timeout, MAX_BODY_BYTES).await;
            if truncated {
                debug!(status, "Response body truncated");
            }
            body
        };

        RawResponse {
            status,
            content_type,
            body,
            final_url: Some(final_url),
        }
    }

    /// Download a whole document regardless of its content type
    ///
    /// Unlike [`HttpTransport::send`] this fails on non-2xx statuses and on
    /// bodies that are cut short, so a partial file is never returned.
    pub async fn fetch_document(&self, url: &str) -> Result<Bytes, ScrapeError> {
        let response = self
            .send_with_retry(HttpMethod::Get, url, Some(DOCUMENT_TIMEOUT))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::RequestError(format!("HTTP {}", status.as_u16())));
        }
        let (body, truncated) =
            read_body_with_timeout(response, DOCUMENT_TIMEOUT, MAX_DOCUMENT_BYTES).await;
        if truncated {
            return Err(ScrapeError::RequestError(format!(
                "Incomplete download ({} bytes read)",
                body.len()
            )));
        }
        Ok(body)
    }

    async fn send_with_retry(
        &self,
        method: HttpMethod,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ScrapeError> {
        let reqwest_method = match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let mut attempt = 0;
        loop {
            let mut request = self
                .client
                .request(reqwest_method.clone(), url)
                .headers(self.request_headers());
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            let response = request.send().await.map_err(ScrapeError::from_reqwest)?;

            let status = response.status().as_u16();
            if RETRY_STATUSES.contains(&status) && attempt < self.retry.max_retries {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                let delay = self.retry.backoff(attempt, retry_after);
                debug!(url, status, attempt, delay_ms = delay.as_millis() as u64, "Retrying request");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if RETRY_STATUSES.contains(&status) && self.retry.max_retries > 0 {
                warn!(url, status, attempts = attempt + 1, "Retries exhausted");
            }

            return Ok(response);
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn send(&self, method: HttpMethod, url: &str) -> Result<RawResponse, ScrapeError> {
        let response = self.send_with_retry(method, url, None).await?;
        Ok(self.into_raw(method, response).await)
    }
}

/// Check if content type indicates binary content
pub(crate) fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.trim().to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read response body with timeout, returning partial content if timeout occurs
async fn read_body_with_timeout(
    response: reqwest::Response,
    timeout: Duration,
    limit: usize,
) -> (Bytes, bool) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let chunk_future = stream.next();
        let timeout_future = tokio::time::sleep_until(deadline);

        tokio::select! {
            chunk = chunk_future => {
                match chunk {
                    Some(Ok(bytes)) => {
                        body.extend_from_slice(&bytes);
                        if body.len() > limit {
                            body.truncate(limit);
                            return (Bytes::from(body), true);
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Error reading body chunk, keeping partial content");
                        let has_content = !body.is_empty();
                        return (Bytes::from(body), has_content);
                    }
                    None => {
                        return (Bytes::from(body), false);
                    }
                }
            }
            _ = timeout_future => {
                warn!("Body timeout reached, returning partial content");
                return (Bytes::from(body), true);
            }
        }
    }
}
