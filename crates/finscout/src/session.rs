//! Per-scrape crawl state
//!
//! A [`CrawlSession`] is created for one scrape and dropped when it ends. It
//! is never shared across companies.

use crate::types::FinancialUrl;
use std::collections::HashSet;
use url::Url;

/// Crawl limits for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    pub max_pages: usize,
    pub max_depth: usize,
}

/// Insertion-ordered set of confirmed PDF URLs
#[derive(Debug, Clone, Default)]
pub struct ConfirmedPdfs {
    order: Vec<String>,
    members: HashSet<String>,
}

impl ConfirmedPdfs {
    /// Insert a URL; returns false if it was already confirmed
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.members.contains(&url) {
            return false;
        }
        self.members.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.members.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// URLs in confirmation order
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Aggregate crawl state for one scrape
#[derive(Debug)]
pub struct CrawlSession {
    pub root: Url,
    pub root_domain: String,
    pub limits: CrawlLimits,
    visited: HashSet<String>,
    landed: HashSet<String>,
    pub financial_urls: Vec<FinancialUrl>,
    pub probable_pdfs: Vec<FinancialUrl>,
    pub confirmed: ConfirmedPdfs,
}

impl CrawlSession {
    /// Start a fresh session rooted at `root`
    pub fn new(root: Url, root_domain: String, limits: CrawlLimits) -> Self {
        Self {
            root,
            root_domain,
            limits,
            visited: HashSet::new(),
            landed: HashSet::new(),
            financial_urls: Vec::new(),
            probable_pdfs: Vec::new(),
            confirmed: ConfirmedPdfs::default(),
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url) || self.landed.contains(url)
    }

    /// Record where a fetch ended up after redirects
    ///
    /// The URL is never fetched again but does not count against the budget.
    pub fn mark_landed(&mut self, url: &str) {
        if !self.visited.contains(url) {
            self.landed.insert(url.to_string());
        }
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// True once the page budget is spent
    pub fn budget_exhausted(&self) -> bool {
        self.visited.len() >= self.limits.max_pages
    }

    /// Mark a URL as visited if depth and page budget allow it
    ///
    /// Returns false when the URL must not be fetched: too deep, already
    /// visited, or the page budget is spent.
    pub fn try_visit(&mut self, url: &str, depth: usize) -> bool {
        if depth > self.limits.max_depth || self.budget_exhausted() || self.is_visited(url) {
            return false;
        }
        self.visited.insert(url.to_string());
        true
    }

    /// Financial URLs deduplicated by URL, first occurrence wins
    pub fn unique_financial_urls(&self) -> Vec<FinancialUrl> {
        let mut seen = HashSet::new();
        self.financial_urls
            .iter()
            .filter(|f| seen.insert(f.url.clone()))
            .cloned()
            .collect()
    }
}
