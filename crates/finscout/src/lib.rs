//! FinScout - targeted crawler for company financial statements
//!
//! Walks a company website within page and depth budgets, follows only
//! financially relevant links, and returns PDF report candidates that were
//! confirmed by extension or content type.
//!
//! ## Pipeline
//!
//! - [`scope`] resolves links and keeps the crawl on the company's domain
//! - [`classify`] decides which links are financial and which look like reports
//! - [`ContentFetcher`] fetches pages, escalating script-driven shells to a
//!   headless [`Renderer`]
//! - [`crawler`] runs the depth-first traversal over root and seed paths
//! - [`verify`] confirms probable PDFs with header-only requests
//! - [`sink`] records confirmed reports; [`download`] saves them to disk
//!
//! ```no_run
//! # async fn run() -> Result<(), finscout::ScrapeError> {
//! use finscout::{Scout, ScrapeRequest};
//!
//! let scout = Scout::builder().build();
//! let response = scout.scrape(ScrapeRequest::new("example.com").max_pages(50)).await?;
//! for url in &response.confirmed_pdf_urls {
//!     println!("{url}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod content;
pub mod crawler;
pub mod download;
mod error;
pub mod fetchers;
pub mod scope;
pub mod search;
pub mod session;
pub mod sink;
mod tool;
mod types;
pub mod verify;

pub use client::{scrape, scrape_with_cancel, scrape_with_options, ScrapeOptions};
pub use content::{ContentFetcher, FetchSettings, PageContent};
pub use crawler::{CrawlConfig, CrawlReport, SEED_PATHS};
pub use download::{download_documents, DownloadReport};
pub use error::ScrapeError;
pub use fetchers::{
    HttpTransport, RawResponse, RenderConfig, Renderer, RendererFactory, ReqwestTransport,
    RetryPolicy,
};
#[cfg(feature = "browser")]
pub use fetchers::ChromeRenderer;
pub use search::{SearchProvider, SearchResult, SerpApiSearch};
pub use sink::{DocumentRecord, DocumentSink, MemorySink};
#[cfg(feature = "postgres")]
pub use sink::PostgresSink;
pub use tool::{Scout, ScoutBuilder, ScrapeStatus};
pub use types::{
    CrawlTarget, FinancialPage, FinancialUrl, HttpMethod, LinkCandidate, ScrapeErrorResponse,
    ScrapeMetadata, ScrapeRequest, ScrapeResponse, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Everruns FinScout/1.0";

/// Tool description for LLM consumption
pub const TOOL_DESCRIPTION: &str = r#"Finds official financial statement PDFs on a company website.

- Crawls the company domain from the home page and investor-relations paths
- Follows only financially relevant links, within page and depth budgets
- Renders script-driven pages in a headless browser when needed
- Confirms PDF candidates by content type"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# FinScout

Finds official financial statements (annual and quarterly reports, 10-K/10-Q
filings, investor-relations PDFs) on a company website.

## Capabilities
- Domain-scoped crawl from the home page plus well-known IR paths
  (/investors, /investor-relations, /financial-reports, /financials,
  /annual-reports, /reports, /sec-filings, /ir)
- Keyword classification of links and anchor text
- Headless browser fallback for script-driven pages
- HEAD verification of probable PDFs
- Search-engine lookup of a company's financial statement PDF

## Input Parameters
- `company_url` (required): Company website, `https://` is assumed when omitted
- `max_pages` (optional): Page budget shared by all crawls (default: 150)
- `max_depth` (optional): Link depth from the root or a seed path (default: 4)
- `use_browser` (optional): Allow headless rendering (default: true)
- `deadline_secs` (optional): Stop crawling after this many seconds

## Output Fields
- `company_url`: The URL as requested
- `confirmed_pdf_urls`: Confirmed PDFs, report-titled ones first
- `financial_pages`: Financially relevant links `{url, text, is_pdf}`
- `metadata.total_pages_scraped`: Pages fetched
- `metadata.total_financial_urls`: Entries in `financial_pages`
- `metadata.total_confirmed_pdfs`: Entries in `confirmed_pdf_urls`
- `metadata.used_browser_automation`: True if any page was rendered
- `metadata.status`: "success"

## Examples

### Scrape a company site
```json
{"company_url": "example.com"}
```

### Quick, shallow scrape without a browser
```json
{"company_url": "https://www.example.com", "max_pages": 30, "max_depth": 1, "use_browser": false}
```

## Error Handling
- Missing or empty `company_url` is rejected before crawling
- Unreachable pages, render failures and verification failures are skipped;
  the scrape still returns whatever was found
"#;
