//! Content fetcher: cheap static fetch first, headless render when needed
//!
//! Every fetch is paced by a random delay and holds a permit from a pool
//! shared by the whole session. Failures never propagate; an unreachable
//! page is just [`PageContent::Unavailable`].

use crate::error::ScrapeError;
use crate::fetchers::{HttpTransport, RawResponse, Renderer, RendererFactory};
use crate::types::HttpMethod;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

/// Bodies smaller than this are candidates for client-side rendering
const RENDER_SIZE_THRESHOLD: usize = 4096;

/// Markers left in the HTML shell by common client-side frameworks
const CLIENT_RENDER_MARKERS: &[&str] = &[
    "id=\"root\"",
    "id=\"app\"",
    "id=\"__next\"",
    "id=\"__nuxt\"",
    "__next_data__",
    "window.__nuxt__",
    "window.__initial_state__",
    "data-reactroot",
    "ng-app",
    "ng-version",
    "data-server-rendered",
    "you need to enable javascript",
    "please enable javascript",
];

/// Outcome of the static fetch step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// HTML that can be parsed as-is
    Static(String),
    /// HTML shell of a script-driven page
    NeedsRender(String),
    /// Content type is `application/pdf`
    Pdf,
    /// Network error, non-2xx status or unsupported content
    Failed,
}

/// What a page turned out to be after fetching (and possibly rendering)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// HTML along with the URL it was served from after redirects
    Html { url: String, html: String },
    Pdf,
    Unavailable,
}

/// Pacing and timeout settings for the content fetcher
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Concurrent in-flight fetches
    pub max_concurrency: usize,
    /// Random delay before every fetch, lower bound
    pub min_delay: Duration,
    /// Random delay before every fetch, upper bound
    pub max_delay: Duration,
    /// Page-load timeout for renders
    pub render_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            min_delay: Duration::from_millis(250),
            max_delay: Duration::from_millis(1000),
            render_timeout: Duration::from_secs(30),
        }
    }
}

/// Lazily created, session-owned renderer state
struct RenderSlot {
    factory: Option<RendererFactory>,
    renderer: Option<Box<dyn Renderer>>,
    disabled: bool,
}

/// Dual-strategy fetcher owned by one crawl session
pub struct ContentFetcher {
    transport: Arc<dyn HttpTransport>,
    permits: Arc<Semaphore>,
    settings: FetchSettings,
    render: Mutex<RenderSlot>,
    rendered_pages: AtomicUsize,
}

impl ContentFetcher {
    /// Create a fetcher; pass `None` as factory to disable rendering
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        settings: FetchSettings,
        renderer_factory: Option<RendererFactory>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
        Self {
            transport,
            permits,
            settings,
            render: Mutex::new(RenderSlot {
                factory: renderer_factory,
                renderer: None,
                disabled: false,
            }),
            rendered_pages: AtomicUsize::new(0),
        }
    }

    /// Number of pages successfully rendered so far
    pub fn rendered_pages(&self) -> usize {
        self.rendered_pages.load(Ordering::Relaxed)
    }

    /// Fetch a page, escalating to the renderer for script-driven shells
    ///
    /// Relative links on the returned page resolve against the URL the
    /// request landed on, which differs from `url` after a redirect.
    pub async fn fetch(&self, url: &str) -> PageContent {
        let response = match self.paced_send(HttpMethod::Get, url).await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "Fetch failed");
                return PageContent::Unavailable;
            }
        };
        let page_url = response
            .final_url
            .clone()
            .unwrap_or_else(|| url.to_string());
        if page_url != url {
            debug!(url, final_url = %page_url, "Followed redirect");
        }

        match classify_response(&response) {
            FetchOutcome::Static(html) => PageContent::Html { url: page_url, html },
            FetchOutcome::Pdf => PageContent::Pdf,
            FetchOutcome::Failed => PageContent::Unavailable,
            FetchOutcome::NeedsRender(shell) => {
                let html = self.render(&page_url).await.unwrap_or(shell);
                PageContent::Html { url: page_url, html }
            }
        }
    }

    /// Header-only existence check; returns the raw response
    pub async fn head(&self, url: &str) -> Result<RawResponse, ScrapeError> {
        self.paced_send(HttpMethod::Head, url).await
    }

    async fn paced_send(&self, method: HttpMethod, url: &str) -> Result<RawResponse, ScrapeError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ScrapeError::RequestError(e.to_string()))?;

        self.pace().await;

        debug!(url, %method, transport = self.transport.name(), "Sending request");
        self.transport.send(method, url).await
    }

    /// Sleep for a random delay within the configured pacing range
    async fn pace(&self) {
        let delay = pacing_delay(self.settings.min_delay, self.settings.max_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Render a page, creating the renderer on first use
    ///
    /// Any render error disables rendering for the rest of the session.
    async fn render(&self, url: &str) -> Option<String> {
        let mut slot = self.render.lock().await;
        if slot.disabled {
            return None;
        }
        if slot.renderer.is_none() {
            let factory = slot.factory.clone()?;
            slot.renderer = Some(factory());
        }
        let renderer = slot.renderer.as_ref()?;

        let _permit = self.permits.acquire().await.ok()?;
        self.pace().await;

        debug!(url, renderer = renderer.name(), "Rendering page");
        let result = renderer.render(url, self.settings.render_timeout).await;
        match result {
            Ok(html) => {
                self.rendered_pages.fetch_add(1, Ordering::Relaxed);
                Some(html)
            }
            Err(e) => {
                warn!(url, error = %e, "Render failed, disabling rendering for this session");
                slot.disabled = true;
                None
            }
        }
    }

    /// Release the renderer, if one was created
    ///
    /// Safe to call more than once; rendering stays disabled afterwards.
    pub async fn release(&self) {
        let mut slot = self.render.lock().await;
        slot.disabled = true;
        if let Some(renderer) = slot.renderer.take() {
            renderer.close().await;
            info!(renderer = renderer.name(), "Renderer released");
        }
    }
}

impl Drop for ContentFetcher {
    fn drop(&mut self) {
        // Reached without `release` only when the session was aborted
        let Some(renderer) = self.render.get_mut().renderer.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { renderer.close().await });
            }
            Err(_) => warn!("Renderer dropped outside a runtime, not closed"),
        }
    }
}

/// Random delay in `min..=max`, millisecond resolution
pub fn pacing_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let lo = min.as_millis() as u64;
    let hi = max.as_millis() as u64;
    Duration::from_millis(fastrand::u64(lo..=hi))
}

/// Classify a raw response by status, content type and body shape
pub fn classify_response(response: &RawResponse) -> FetchOutcome {
    if !response.is_success() {
        return FetchOutcome::Failed;
    }
    if response.is_pdf() {
        return FetchOutcome::Pdf;
    }

    let body = String::from_utf8_lossy(&response.body).to_string();
    if !is_html(&response.content_type, &body) {
        return FetchOutcome::Failed;
    }

    if needs_render(&body) {
        FetchOutcome::NeedsRender(body)
    } else {
        FetchOutcome::Static(body)
    }
}

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: &Option<String>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let trimmed = body.trim_start();
    let head: String = trimmed.chars().take(16).collect::<String>().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Heuristic for client-rendered pages: a small shell with scripts and
/// either a framework marker or no links at all
pub fn needs_render(body: &str) -> bool {
    if body.len() >= RENDER_SIZE_THRESHOLD {
        return false;
    }
    let lower = body.to_lowercase();
    if !lower.contains("<script") {
        return false;
    }
    CLIENT_RENDER_MARKERS.iter().any(|m| lower.contains(m)) || !lower.contains("<a ")
}
