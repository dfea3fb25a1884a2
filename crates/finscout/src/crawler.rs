//! Crawl orchestrator
//!
//! Walks a company site depth-first from the root and a fixed list of
//! investor-relations seed paths. Only financially relevant links are
//! followed; everything else in scope is looked at and dropped. After the
//! walk, collected links are reclassified, probable PDFs are verified and
//! the results are deduplicated and ranked.

use crate::classify::{is_financial_related, is_likely_financial_pdf};
use crate::content::{ContentFetcher, PageContent};
use crate::scope::{is_in_scope, normalize};
use crate::session::{CrawlLimits, CrawlSession};
use crate::types::{CrawlTarget, FinancialUrl, LinkCandidate};
use crate::verify::verify;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Well-known investor-relations paths visited in addition to the root
pub const SEED_PATHS: &[&str] = &[
    "/investors",
    "/investor-relations",
    "/financial-reports",
    "/financials",
    "/annual-reports",
    "/reports",
    "/sec-filings",
    "/ir",
];

/// Crawl settings that do not change between requests
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Paths appended to the root origin as extra depth-0 starting points
    pub seed_paths: Vec<String>,
    /// Block patterns on top of the built-in list
    pub extra_blocked: Vec<String>,
    /// Concurrent verification requests
    pub verify_concurrency: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_paths: SEED_PATHS.iter().map(|s| s.to_string()).collect(),
            extra_blocked: Vec::new(),
            verify_concurrency: 5,
        }
    }
}

/// Result of one crawl session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Confirmed PDFs, report-titled ones first, then discovery order
    pub confirmed_pdfs: Vec<String>,
    /// Financially relevant links, deduplicated, in discovery order
    pub financial_urls: Vec<FinancialUrl>,
    /// Pages fetched
    pub pages_visited: usize,
    /// True when at least one page was rendered
    pub used_renderer: bool,
}

/// Run a full crawl session
///
/// Never fails: unreachable pages, render failures and verification
/// failures are all recovered. Cancelling `cancel` stops dispatching new
/// pages; whatever was collected is still reclassified and verified.
pub async fn crawl(
    fetcher: &ContentFetcher,
    root: Url,
    root_domain: String,
    limits: CrawlLimits,
    config: &CrawlConfig,
    cancel: &CancellationToken,
) -> CrawlReport {
    info!(
        root = %root,
        max_pages = limits.max_pages,
        max_depth = limits.max_depth,
        "Starting crawl"
    );
    let mut session = CrawlSession::new(root, root_domain, limits);

    let root_target = CrawlTarget {
        url: session.root.to_string(),
        depth: 0,
    };
    if let RootOutcome::Pdf = visit_root(&mut session, fetcher, config, cancel, root_target).await
    {
        info!(root = %session.root, "Root URL is a PDF");
        let pages_visited = session.visited_count();
        return CrawlReport {
            confirmed_pdfs: session.confirmed.into_vec(),
            financial_urls: Vec::new(),
            pages_visited,
            used_renderer: fetcher.rendered_pages() > 0,
        };
    }

    for path in &config.seed_paths {
        if cancel.is_cancelled() || session.budget_exhausted() {
            break;
        }
        let Ok(seed) = session.root.join(path) else {
            continue;
        };
        let target = CrawlTarget {
            url: seed.to_string(),
            depth: 0,
        };
        traverse(&mut session, fetcher, config, cancel, vec![target]).await;
    }

    finish(session, fetcher, config).await
}

enum RootOutcome {
    Pdf,
    Crawled,
}

async fn visit_root(
    session: &mut CrawlSession,
    fetcher: &ContentFetcher,
    config: &CrawlConfig,
    cancel: &CancellationToken,
    target: CrawlTarget,
) -> RootOutcome {
    if cancel.is_cancelled() || !session.try_visit(&target.url, target.depth) {
        return RootOutcome::Crawled;
    }

    let content = tokio::select! {
        content = fetcher.fetch(&target.url) => content,
        _ = cancel.cancelled() => return RootOutcome::Crawled,
    };

    match content {
        PageContent::Pdf => {
            session.confirmed.insert(target.url);
            RootOutcome::Pdf
        }
        PageContent::Unavailable => {
            debug!(url = %target.url, "Root page unreachable");
            RootOutcome::Crawled
        }
        PageContent::Html { url, html } => {
            session.mark_landed(&url);
            let children = process_page(session, config, &target, &url, &html);
            traverse(session, fetcher, config, cancel, children).await;
            RootOutcome::Crawled
        }
    }
}

/// Depth-first walk over an explicit stack
async fn traverse(
    session: &mut CrawlSession,
    fetcher: &ContentFetcher,
    config: &CrawlConfig,
    cancel: &CancellationToken,
    start: Vec<CrawlTarget>,
) {
    let mut stack: Vec<CrawlTarget> = start.into_iter().rev().collect();

    while let Some(target) = stack.pop() {
        if cancel.is_cancelled() {
            debug!("Crawl cancelled, stopping dispatch");
            break;
        }
        if !session.try_visit(&target.url, target.depth) {
            continue;
        }

        let content = tokio::select! {
            content = fetcher.fetch(&target.url) => content,
            _ = cancel.cancelled() => break,
        };

        match content {
            // PDFs are leaves
            PageContent::Pdf => {
                if is_financial_related(&target.url, None) {
                    debug!(url = %target.url, "Confirmed PDF during crawl");
                    session.confirmed.insert(target.url);
                }
            }
            PageContent::Unavailable => {
                debug!(url = %target.url, "Page unreachable");
            }
            PageContent::Html { url, html } => {
                session.mark_landed(&url);
                let children = process_page(session, config, &target, &url, &html);
                stack.extend(children.into_iter().rev());
            }
        }
    }
}

/// Classify every link on a page; returns the links worth following
///
/// `served_from` is the URL the page was actually served from and is the
/// base for relative links.
fn process_page(
    session: &mut CrawlSession,
    config: &CrawlConfig,
    page: &CrawlTarget,
    served_from: &str,
    html: &str,
) -> Vec<CrawlTarget> {
    let Ok(page_url) = Url::parse(served_from) else {
        return Vec::new();
    };
    let (base, links) = extract_links(html, &page_url);
    debug!(url = %served_from, depth = page.depth, links = links.len(), "Parsed page");

    let can_descend = page.depth < session.limits.max_depth;
    let mut queued = HashSet::new();
    let mut children = Vec::new();

    for link in links {
        let Some(url) = normalize(&link.href, &base) else {
            continue;
        };
        if !is_in_scope(&url, &session.root_domain, &config.extra_blocked) {
            continue;
        }

        if is_likely_financial_pdf(&url, Some(&link.text)) && !session.confirmed.contains(&url) {
            session.probable_pdfs.push(FinancialUrl {
                url: url.clone(),
                text: link.text.clone(),
            });
        }

        if is_financial_related(&url, Some(&link.text)) {
            session.financial_urls.push(FinancialUrl {
                url: url.clone(),
                text: link.text,
            });
            if can_descend && !session.is_visited(&url) && queued.insert(url.clone()) {
                children.push(CrawlTarget {
                    url,
                    depth: page.depth + 1,
                });
            }
        }
    }

    children
}

/// Extract anchors and the effective base URL from a page
///
/// Honours `<base href>`. Anchor text falls back to the `title` and
/// `aria-label` attributes when the anchor has no text.
pub fn extract_links(html: &str, page_url: &Url) -> (Url, Vec<LinkCandidate>) {
    let document = Html::parse_document(html);

    let base = Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone());

    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return (base, Vec::new());
    };

    let links = document
        .select(&anchor_selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.to_string();
            let mut text = collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "));
            if text.is_empty() {
                text = el
                    .value()
                    .attr("title")
                    .or_else(|| el.value().attr("aria-label"))
                    .map(collapse_whitespace)
                    .unwrap_or_default();
            }
            Some(LinkCandidate { href, text })
        })
        .collect();

    (base, links)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reclassify, verify, deduplicate and rank
async fn finish(
    mut session: CrawlSession,
    fetcher: &ContentFetcher,
    config: &CrawlConfig,
) -> CrawlReport {
    let collected = session.financial_urls.clone();
    for link in &collected {
        if link.url.to_ascii_lowercase().ends_with(".pdf") {
            session.confirmed.insert(link.url.clone());
        } else if is_likely_financial_pdf(&link.url, Some(&link.text))
            && !session.confirmed.contains(&link.url)
        {
            session.probable_pdfs.push(link.clone());
        }
    }

    let candidates: Vec<String> = session
        .probable_pdfs
        .iter()
        .filter(|p| !session.confirmed.contains(&p.url))
        .map(|p| p.url.clone())
        .collect();
    let verified = verify(
        fetcher,
        &candidates,
        &session.confirmed,
        config.verify_concurrency,
    )
    .await;
    for url in verified {
        session.confirmed.insert(url);
    }

    let financial_urls = session.unique_financial_urls();
    let pages_visited = session.visited_count();

    let mut texts: HashMap<&str, &str> = HashMap::new();
    for link in financial_urls.iter().chain(session.probable_pdfs.iter()) {
        texts.entry(link.url.as_str()).or_insert(link.text.as_str());
    }
    let mut confirmed_pdfs: Vec<String> = session.confirmed.iter().cloned().collect();
    // Stable: discovery order is kept within each group
    confirmed_pdfs.sort_by_key(|url| !is_likely_financial_pdf(url, texts.get(url.as_str()).copied()));

    info!(
        pages = pages_visited,
        financial_urls = financial_urls.len(),
        confirmed_pdfs = confirmed_pdfs.len(),
        "Crawl finished"
    );

    CrawlReport {
        confirmed_pdfs,
        financial_urls,
        pages_visited,
        used_renderer: fetcher.rendered_pages() > 0,
    }
}
