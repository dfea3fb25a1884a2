//! Search-engine lookup for financial statement PDFs
//!
//! An alternative to crawling: ask a web search engine for
//! `"{company} financial statement {year} filetype:pdf"` and pick the first
//! organic result that looks like a full-year report.

use crate::error::ScrapeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default SerpApi endpoint
pub const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

/// A result must mention one of these in its title or snippet
pub const INCLUDE_KEYWORDS: &[&str] = &[
    "financial statement",
    "financial results",
    "annual",
    "report",
    "earnings",
];

/// Results mentioning any of these are partial-year documents
pub const EXCLUDE_KEYWORDS: &[&str] = &[
    "q1",
    "q2",
    "q3",
    "q4",
    "1h",
    "h1",
    "half-year",
    "interim",
    "quarter",
];

/// One organic search result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Web search capability
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Run a query and return organic results in rank order
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ScrapeError>;
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SearchResult>,
    #[serde(default)]
    error: Option<String>,
}

/// SerpApi Google search
pub struct SerpApiSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SerpApiSearch {
    /// Create a provider against the public SerpApi endpoint
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ScrapeError::ClientBuildError)?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: SERPAPI_ENDPOINT.to_string(),
        })
    }

    /// Point the provider at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for SerpApiSearch {
    fn name(&self) -> &'static str {
        "serpapi"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ScrapeError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| ScrapeError::SearchError(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ScrapeError::from_reqwest)?;

        let status = response.status();
        let body: SerpApiResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::SearchError(format!("invalid response: {e}")))?;

        if let Some(error) = body.error {
            return Err(ScrapeError::SearchError(error));
        }
        if !status.is_success() {
            return Err(ScrapeError::SearchError(format!("HTTP {}", status.as_u16())));
        }

        debug!(results = body.organic_results.len(), "Search response received");
        Ok(body.organic_results)
    }
}

/// Build the search query for a company
pub fn build_query(company: &str, year: Option<u32>) -> String {
    match year {
        Some(year) => format!("{} financial statement {} filetype:pdf", company.trim(), year),
        None => format!("{} financial statement filetype:pdf", company.trim()),
    }
}

/// True when a result links a PDF and reads like a full-year report
pub fn is_relevant_pdf(result: &SearchResult) -> bool {
    let path_has_pdf = Url::parse(&result.link)
        .map(|u| u.path().contains(".pdf"))
        .unwrap_or(false);
    if !path_has_pdf {
        return false;
    }

    let title = result.title.to_lowercase();
    let snippet = result.snippet.to_lowercase();
    let mentions = |kw: &&str| title.contains(*kw) || snippet.contains(*kw);

    INCLUDE_KEYWORDS.iter().any(mentions) && !EXCLUDE_KEYWORDS.iter().any(mentions)
}

/// First relevant PDF in rank order
pub fn select_financial_pdf(results: &[SearchResult]) -> Option<&SearchResult> {
    results.iter().find(|r| is_relevant_pdf(r))
}

/// Look up a company's financial statement PDF
///
/// Returns `Ok(None)` when the search succeeded but nothing suitable came
/// back.
pub async fn find_financial_statement(
    provider: &dyn SearchProvider,
    company: &str,
    year: Option<u32>,
) -> Result<Option<String>, ScrapeError> {
    let query = build_query(company, year);
    info!(company, provider = provider.name(), query = %query, "Searching for financial statement");

    let results = provider.search(&query).await?;
    match select_financial_pdf(&results) {
        Some(found) => {
            info!(company, url = %found.link, "Found financial statement");
            Ok(Some(found.link.clone()))
        }
        None => {
            info!(company, results = results.len(), "No suitable PDF found");
            Ok(None)
        }
    }
}
