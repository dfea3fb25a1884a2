//! Core types for finscout

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default page budget for one scrape
pub const DEFAULT_MAX_PAGES: usize = 150;

/// Default link depth for one scrape
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// HTTP method used by the transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET request
    #[default]
    Get,
    /// HTTP HEAD request
    Head,
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            _ => Err("Invalid method: must be GET or HEAD".to_string()),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Head => write!(f, "HEAD"),
        }
    }
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_use_browser() -> bool {
    true
}

/// Request to scrape a company website for financial reports
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeRequest {
    /// Company website (required). `https://` is assumed when no scheme is given
    pub company_url: String,

    /// Maximum number of pages fetched (default 150)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum link depth from the root or a seed path (default 4)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Render script-driven pages in a headless browser (default true)
    #[serde(default = "default_use_browser")]
    pub use_browser: bool,

    /// Overall deadline in seconds; the crawl stops dispatching when reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl Default for ScrapeRequest {
    fn default() -> Self {
        Self {
            company_url: String::new(),
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            use_browser: true,
            deadline_secs: None,
        }
    }
}

impl ScrapeRequest {
    /// Create a new request with the given company URL
    pub fn new(company_url: impl Into<String>) -> Self {
        Self {
            company_url: company_url.into(),
            ..Default::default()
        }
    }

    /// Set the page budget
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the depth budget
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable rendered-browser fallback
    pub fn use_browser(mut self, use_browser: bool) -> Self {
        self.use_browser = use_browser;
        self
    }

    /// Set an overall deadline
    pub fn deadline_secs(mut self, secs: u64) -> Self {
        self.deadline_secs = Some(secs);
        self
    }
}

/// A financially relevant page or document found during the crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialPage {
    /// Absolute URL
    pub url: String,
    /// Anchor text the link was found with
    pub text: String,
    /// True when the URL is a PDF (by extension or confirmed content type)
    pub is_pdf: bool,
}

/// Crawl statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeMetadata {
    /// Pages fetched (plain or rendered)
    pub total_pages_scraped: usize,
    /// Entries in `financial_pages`
    pub total_financial_urls: usize,
    /// Entries in `confirmed_pdf_urls`
    pub total_confirmed_pdfs: usize,
    /// True when at least one page was rendered in a headless browser
    pub used_browser_automation: bool,
    /// Always "success" for a completed scrape
    pub status: String,
}

/// Successful scrape result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeResponse {
    /// The company URL as requested
    pub company_url: String,
    /// PDFs proven by extension or content type, best candidates first
    pub confirmed_pdf_urls: Vec<String>,
    /// Financially relevant links in discovery order, deduplicated by URL
    pub financial_pages: Vec<FinancialPage>,
    /// Crawl statistics
    pub metadata: ScrapeMetadata,
}

/// Error payload returned by the HTTP boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeErrorResponse {
    /// Error description
    pub error: String,
    /// The company URL as requested, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_url: Option<String>,
    /// Always "error"
    pub status: String,
    /// Human-readable summary
    pub message: String,
}

impl ScrapeErrorResponse {
    /// Build an error payload
    pub fn new(
        error: impl Into<String>,
        company_url: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            company_url,
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// A pending unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub depth: usize,
}

/// An outbound link before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub href: String,
    pub text: String,
}

/// A classified link: financially relevant or probable PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialUrl {
    pub url: String,
    pub text: String,
}
