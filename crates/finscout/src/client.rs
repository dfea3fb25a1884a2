//! Scrape entry points
//!
//! This module wires a crawl session together: request validation, the
//! HTTP transport, the optional renderer, deadline handling and result
//! shaping. The traversal itself lives in [`crawler`](crate::crawler).

use crate::classify::has_pdf_extension;
use crate::content::{ContentFetcher, FetchSettings};
use crate::crawler::{crawl, CrawlConfig, SEED_PATHS};
use crate::error::ScrapeError;
use crate::fetchers::{HttpTransport, RenderConfig, RendererFactory, ReqwestTransport, RetryPolicy};
use crate::scope::{company_name, normalize_root, url_registrable_domain};
use crate::session::CrawlLimits;
use crate::sink::{file_name_from_url, DocumentSink};
use crate::types::{FinancialPage, ScrapeMetadata, ScrapeRequest, ScrapeResponse};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Scrape options that can be configured via the scout builder
#[derive(Clone)]
pub struct ScrapeOptions {
    /// Pinned User-Agent; random browser agents are used when unset
    pub user_agent: Option<String>,
    /// Concurrent in-flight fetches per session
    pub max_concurrency: usize,
    /// Per-request timeout for plain fetches
    pub request_timeout: Duration,
    /// Retry policy for throttled or failing upstreams
    pub retry: RetryPolicy,
    /// Pacing delay before every fetch, lower bound
    pub min_delay: Duration,
    /// Pacing delay before every fetch, upper bound
    pub max_delay: Duration,
    /// Page-load timeout for rendered fetches
    pub render_timeout: Duration,
    /// Browser settings for the default renderer
    pub render: RenderConfig,
    /// Block patterns on top of the built-in list
    pub block_patterns: Vec<String>,
    /// Investor-relations paths visited in addition to the root
    pub seed_paths: Vec<String>,
    /// Overall deadline when the request does not carry one
    pub deadline: Option<Duration>,
    /// Transport override; a reqwest transport is built when unset
    pub transport: Option<Arc<dyn HttpTransport>>,
    /// Renderer override; the Chrome renderer is used when unset
    pub renderer_factory: Option<RendererFactory>,
    /// Where confirmed PDFs are recorded
    pub sink: Option<Arc<dyn DocumentSink>>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            user_agent: None,
            max_concurrency: fetch.max_concurrency,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            min_delay: fetch.min_delay,
            max_delay: fetch.max_delay,
            render_timeout: fetch.render_timeout,
            render: RenderConfig::default(),
            block_patterns: Vec::new(),
            seed_paths: SEED_PATHS.iter().map(|s| s.to_string()).collect(),
            deadline: None,
            transport: None,
            renderer_factory: None,
            sink: None,
        }
    }
}

impl fmt::Debug for ScrapeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeOptions")
            .field("user_agent", &self.user_agent)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .field("render_timeout", &self.render_timeout)
            .field("render", &self.render)
            .field("block_patterns", &self.block_patterns)
            .field("seed_paths", &self.seed_paths)
            .field("deadline", &self.deadline)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_renderer", &self.renderer_factory.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Scrape a company website with default options
///
/// For custom options, use [`scrape_with_options`] or the
/// [`Scout`](crate::Scout) builder.
pub async fn scrape(req: ScrapeRequest) -> Result<ScrapeResponse, ScrapeError> {
    scrape_with_options(req, ScrapeOptions::default()).await
}

/// Scrape a company website with custom options
pub async fn scrape_with_options(
    req: ScrapeRequest,
    options: ScrapeOptions,
) -> Result<ScrapeResponse, ScrapeError> {
    scrape_with_cancel(req, options, CancellationToken::new()).await
}

/// Scrape with an external cancellation signal
///
/// Cancelling `cancel` (or reaching the deadline) stops the traversal;
/// whatever was found so far is still verified and returned.
pub async fn scrape_with_cancel(
    req: ScrapeRequest,
    options: ScrapeOptions,
    cancel: CancellationToken,
) -> Result<ScrapeResponse, ScrapeError> {
    // Validate URL early
    if req.company_url.trim().is_empty() {
        return Err(ScrapeError::MissingUrl);
    }
    let root = normalize_root(&req.company_url)
        .ok_or_else(|| ScrapeError::InvalidUrl(req.company_url.clone()))?;
    let root_domain = url_registrable_domain(&root)
        .ok_or_else(|| ScrapeError::InvalidUrl(req.company_url.clone()))?;

    let transport: Arc<dyn HttpTransport> = match options.transport.clone() {
        Some(transport) => transport,
        None => Arc::new(ReqwestTransport::new(
            options.request_timeout,
            options.retry,
            options.user_agent.clone(),
        )?),
    };
    let renderer = if req.use_browser {
        options
            .renderer_factory
            .clone()
            .or_else(|| default_renderer_factory(&options.render))
    } else {
        None
    };

    let fetcher = ContentFetcher::new(
        transport,
        FetchSettings {
            max_concurrency: options.max_concurrency,
            min_delay: options.min_delay,
            max_delay: options.max_delay,
            render_timeout: options.render_timeout,
        },
        renderer,
    );
    let config = CrawlConfig {
        seed_paths: options.seed_paths.clone(),
        extra_blocked: options.block_patterns.clone(),
        verify_concurrency: options.max_concurrency,
    };
    let limits = CrawlLimits {
        max_pages: req.max_pages,
        max_depth: req.max_depth,
    };

    let session_cancel = cancel.child_token();
    let _cancel_on_exit = session_cancel.clone().drop_guard();
    let deadline = req.deadline_secs.map(Duration::from_secs).or(options.deadline);
    if let Some(deadline) = deadline {
        let token = session_cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    info!(deadline_secs = deadline.as_secs_f64(), "Scrape deadline reached");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });
    }

    let report = crawl(&fetcher, root, root_domain, limits, &config, &session_cancel).await;
    fetcher.release().await;

    if let Some(ref sink) = options.sink {
        record_documents(sink.as_ref(), &req.company_url, &report.confirmed_pdfs).await;
    }

    let confirmed: HashSet<&str> = report.confirmed_pdfs.iter().map(String::as_str).collect();
    let financial_pages: Vec<FinancialPage> = report
        .financial_urls
        .iter()
        .map(|f| FinancialPage {
            url: f.url.clone(),
            text: f.text.clone(),
            is_pdf: has_pdf_extension(&f.url) || confirmed.contains(f.url.as_str()),
        })
        .collect();

    let metadata = ScrapeMetadata {
        total_pages_scraped: report.pages_visited,
        total_financial_urls: financial_pages.len(),
        total_confirmed_pdfs: report.confirmed_pdfs.len(),
        used_browser_automation: report.used_renderer,
        status: "success".to_string(),
    };

    Ok(ScrapeResponse {
        company_url: req.company_url,
        confirmed_pdf_urls: report.confirmed_pdfs,
        financial_pages,
        metadata,
    })
}

async fn record_documents(sink: &dyn DocumentSink, company_url: &str, pdfs: &[String]) {
    let Some(company) = company_name(company_url) else {
        return;
    };
    for url in pdfs {
        match file_name_from_url(url) {
            Some(file_name) => sink.upsert(&company, &file_name, url).await,
            None => debug!(url = %url, "No file name, not recorded"),
        }
    }
}

#[cfg(feature = "browser")]
fn default_renderer_factory(config: &RenderConfig) -> Option<RendererFactory> {
    use crate::fetchers::{ChromeRenderer, Renderer};

    let config = config.clone();
    let factory: RendererFactory =
        Arc::new(move || Box::new(ChromeRenderer::new(config.clone())) as Box<dyn Renderer>);
    Some(factory)
}

#[cfg(not(feature = "browser"))]
fn default_renderer_factory(_config: &RenderConfig) -> Option<RendererFactory> {
    None
}
