//! Fetch and render capabilities consumed by the crawl engine
//!
//! Design: the engine never talks to reqwest or a browser directly. It goes
//! through [`HttpTransport`] for plain requests and [`Renderer`] for
//! script-driven pages, so both can be swapped in tests or embedders.

mod http;
mod render;

pub use http::{ReqwestTransport, RetryPolicy, IMPERSONATE_USER_AGENTS};
#[cfg(feature = "browser")]
pub use render::ChromeRenderer;
pub use render::RenderConfig;

use crate::error::ScrapeError;
use crate::types::HttpMethod;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Raw response returned by a transport
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Body bytes (empty for HEAD and binary content)
    pub body: Bytes,
    /// URL the response came from after redirects, when known
    pub final_url: Option<String>,
}

impl RawResponse {
    /// True for 2xx status codes
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the content type is `application/pdf`
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/pdf"))
            .unwrap_or(false)
    }
}

/// Plain HTTP capability
///
/// Implementations own connection pooling, retries and request headers.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Send a request and return status, content type and body
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    async fn send(&self, method: HttpMethod, url: &str) -> Result<RawResponse, ScrapeError>;
}

/// Headless rendering capability
///
/// One renderer instance belongs to one crawl session. It may launch its
/// browser lazily on the first `render` and must release it in `close`.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Load the URL and return the rendered DOM as HTML
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, ScrapeError>;

    /// Release browser resources; the renderer is not used afterwards
    async fn close(&self);
}

/// Creates a fresh renderer for each crawl session
pub type RendererFactory = Arc<dyn Fn() -> Box<dyn Renderer> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_flags() {
        let resp = RawResponse {
            status: 200,
            content_type: Some("Application/PDF; qs=0.9".to_string()),
            body: Bytes::new(),
            final_url: None,
        };
        assert!(resp.is_success());
        assert!(resp.is_pdf());

        let resp = RawResponse {
            status: 404,
            content_type: Some("text/html".to_string()),
            body: Bytes::new(),
            final_url: None,
        };
        assert!(!resp.is_success());
        assert!(!resp.is_pdf());
    }
}
