//! Error types for finscout

use thiserror::Error;

/// Errors that can occur while crawling, fetching, rendering or searching
///
/// A scrape fails only with [`ScrapeError::MissingUrl`] or
/// [`ScrapeError::InvalidUrl`] for bad input, or with
/// [`ScrapeError::ClientBuildError`] when the HTTP client cannot be created
/// (TLS backend unavailable). Every other variant is recovered inside the
/// engine.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Company URL is missing
    #[error("Missing required parameter: company_url")]
    MissingUrl,

    /// Company URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Headless browser failed to launch or load a page
    #[error("Render failed: {0}")]
    RenderError(String),

    /// Search provider returned an error
    #[error("Search failed: {0}")]
    SearchError(String),

    /// No search provider is configured
    #[error("Search is not configured")]
    SearchUnavailable,

    /// Document store query or connection failed
    #[error("Document store error: {0}")]
    StoreError(String),

    /// Writing a downloaded document failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout
        } else if err.is_connect() {
            ScrapeError::ConnectError(err)
        } else {
            ScrapeError::RequestError(err.to_string())
        }
    }

    /// True for errors caused by the caller's input rather than the network
    pub fn is_input_error(&self) -> bool {
        matches!(self, ScrapeError::MissingUrl | ScrapeError::InvalidUrl(_))
    }
}
