//! Scout builder and contract

use crate::client::{scrape_with_cancel, ScrapeOptions};
use crate::error::ScrapeError;
use crate::fetchers::{HttpTransport, RenderConfig, RendererFactory, RetryPolicy};
use crate::search::{find_financial_statement, SearchProvider};
use crate::sink::{file_name_from_url, DocumentSink};
use crate::types::{ScrapeRequest, ScrapeResponse};
use crate::{TOOL_DESCRIPTION, TOOL_LLMTXT};
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Status update during a scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeStatus {
    /// Current phase ("validate", "crawl", "complete")
    pub phase: String,
    /// Optional message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Estimated completion percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_complete: Option<f32>,
}

impl ScrapeStatus {
    /// Create a new status with phase
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: None,
            percent_complete: None,
        }
    }

    /// Set message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set completion percentage
    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent_complete = Some(percent);
        self
    }
}

/// Builder for configuring a [`Scout`]
#[derive(Default)]
pub struct ScoutBuilder {
    options: ScrapeOptions,
    search: Option<Arc<dyn SearchProvider>>,
}

impl ScoutBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the User-Agent instead of rotating browser agents
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = Some(ua.into());
        self
    }

    /// Concurrent in-flight fetches per session
    pub fn max_concurrency(mut self, permits: usize) -> Self {
        self.options.max_concurrency = permits.max(1);
        self
    }

    /// Per-request timeout for plain fetches
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Retry policy for 429 and 5xx responses
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.options.retry = retry;
        self
    }

    /// Random pacing delay range before every fetch
    pub fn pacing(mut self, min: Duration, max: Duration) -> Self {
        self.options.min_delay = min;
        self.options.max_delay = max.max(min);
        self
    }

    /// Page-load timeout for rendered fetches
    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.options.render_timeout = timeout;
        self
    }

    /// Browser settings for the built-in renderer
    pub fn render_config(mut self, config: RenderConfig) -> Self {
        self.options.render = config;
        self
    }

    /// Add a pattern to the block list
    pub fn block_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.options.block_patterns.push(pattern.into());
        self
    }

    /// Replace the investor-relations seed paths
    pub fn seed_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.seed_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Overall deadline for scrapes that do not carry their own
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.options.deadline = Some(deadline);
        self
    }

    /// Use a custom HTTP transport
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.options.transport = Some(transport);
        self
    }

    /// Use a custom renderer; called once per scrape that needs rendering
    pub fn renderer_factory(mut self, factory: RendererFactory) -> Self {
        self.options.renderer_factory = Some(factory);
        self
    }

    /// Record confirmed PDFs and search hits in `sink`
    pub fn sink(mut self, sink: Arc<dyn DocumentSink>) -> Self {
        self.options.sink = Some(sink);
        self
    }

    /// Enable search-engine lookups
    pub fn search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(provider);
        self
    }

    /// Build the scout
    pub fn build(self) -> Scout {
        Scout {
            options: self.options,
            search: self.search,
        }
    }
}

/// Configured financial report scout
#[derive(Clone)]
pub struct Scout {
    options: ScrapeOptions,
    search: Option<Arc<dyn SearchProvider>>,
}

impl Default for Scout {
    fn default() -> Self {
        ScoutBuilder::new().build()
    }
}

impl Scout {
    /// Create a new scout builder
    pub fn builder() -> ScoutBuilder {
        ScoutBuilder::new()
    }

    /// Get tool description
    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// Get full documentation (llmtxt)
    pub fn llmtxt(&self) -> &'static str {
        TOOL_LLMTXT
    }

    /// Options every scrape runs with
    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// True when search-engine lookups are configured
    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    /// Get input schema as JSON
    pub fn input_schema(&self) -> serde_json::Value {
        let schema = schema_for!(ScrapeRequest);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Get output schema as JSON
    pub fn output_schema(&self) -> serde_json::Value {
        let schema = schema_for!(ScrapeResponse);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Scrape a company website
    pub async fn scrape(&self, req: ScrapeRequest) -> Result<ScrapeResponse, ScrapeError> {
        self.scrape_with_cancel(req, CancellationToken::new()).await
    }

    /// Scrape with an external cancellation signal
    pub async fn scrape_with_cancel(
        &self,
        req: ScrapeRequest,
        cancel: CancellationToken,
    ) -> Result<ScrapeResponse, ScrapeError> {
        scrape_with_cancel(req, self.options.clone(), cancel).await
    }

    /// Scrape with status updates
    pub async fn scrape_with_status<F>(
        &self,
        req: ScrapeRequest,
        mut status_callback: F,
    ) -> Result<ScrapeResponse, ScrapeError>
    where
        F: FnMut(ScrapeStatus),
    {
        status_callback(ScrapeStatus::new("validate").with_percent(0.0));

        if req.company_url.trim().is_empty() {
            return Err(ScrapeError::MissingUrl);
        }

        status_callback(
            ScrapeStatus::new("crawl")
                .with_message(req.company_url.clone())
                .with_percent(10.0),
        );

        let result = self.scrape(req).await;

        let done = match result {
            Ok(ref response) => ScrapeStatus::new("complete").with_message(format!(
                "{} confirmed PDFs, {} pages",
                response.metadata.total_confirmed_pdfs, response.metadata.total_pages_scraped
            )),
            Err(ref e) => ScrapeStatus::new("complete").with_message(e.to_string()),
        };
        status_callback(done.with_percent(100.0));

        result
    }

    /// Look up a company's financial statement PDF through the search engine
    ///
    /// A hit is recorded in the sink under `company` as given.
    pub async fn search_financial_statement(
        &self,
        company: &str,
        year: Option<u32>,
    ) -> Result<Option<String>, ScrapeError> {
        let company = company.trim();
        if company.is_empty() {
            return Err(ScrapeError::SearchError(
                "Company name is required".to_string(),
            ));
        }
        let provider = self.search.as_ref().ok_or(ScrapeError::SearchUnavailable)?;

        let found = find_financial_statement(provider.as_ref(), company, year).await?;
        if let (Some(url), Some(sink)) = (found.as_deref(), self.options.sink.as_ref()) {
            if let Some(file_name) = file_name_from_url(url) {
                sink.upsert(company, &file_name, url).await;
            }
        }
        Ok(found)
    }
}
