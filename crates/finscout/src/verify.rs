//! PDF verification and result deduplication
//!
//! Probable PDFs are confirmed with a header-only request through the same
//! paced, permit-bounded fetcher used for crawling. A failed or non-PDF
//! check simply leaves the candidate unconfirmed.

use crate::content::ContentFetcher;
use crate::session::ConfirmedPdfs;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Confirm candidates by content type; returns newly confirmed URLs
///
/// Candidates already in `already_confirmed` are never re-checked.
/// Returned URLs keep the candidates' order.
pub async fn verify(
    fetcher: &ContentFetcher,
    candidates: &[String],
    already_confirmed: &ConfirmedPdfs,
    concurrency: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let pending: Vec<String> = candidates
        .iter()
        .filter(|url| !already_confirmed.contains(url) && seen.insert(url.as_str()))
        .cloned()
        .collect();

    if pending.is_empty() {
        return Vec::new();
    }
    debug!(candidates = pending.len(), "Verifying probable PDFs");

    // Stream items must be owned; borrowed closure arguments make the
    // scrape future non-Send
    let checked: Vec<Option<(usize, String)>> = stream::iter(pending.into_iter().enumerate())
        .map(move |(index, url)| async move {
            let ok = check_pdf(fetcher, &url).await;
            ok.then_some((index, url))
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut confirmed: Vec<(usize, String)> = checked.into_iter().flatten().collect();
    confirmed.sort_unstable_by_key(|(index, _)| *index);
    confirmed.into_iter().map(|(_, url)| url).collect()
}

async fn check_pdf(fetcher: &ContentFetcher, url: &str) -> bool {
    match fetcher.head(url).await {
        Ok(response) if response.is_success() && response.is_pdf() => {
            debug!(url, "Confirmed PDF");
            true
        }
        Ok(response) => {
            debug!(
                url,
                status = response.status,
                content_type = response.content_type.as_deref().unwrap_or(""),
                "Not a PDF"
            );
            false
        }
        Err(e) => {
            warn!(url, error = %e, "Verification request failed");
            false
        }
    }
}
