//! Link classification heuristics
//!
//! Cheap keyword predicates over a URL and its anchor text. Matching is
//! case-insensitive substring matching with OR semantics inside a keyword
//! set. False positives are expected here; the verifier recovers precision.

use url::Url;

/// Keywords that mark a URL or anchor text as financially relevant
pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "financial",
    "financials",
    "annual-report",
    "annual report",
    "annual_report",
    "annualreport",
    "quarterly",
    "investor",
    "shareholder",
    "stockholder",
    "earnings",
    "10-k",
    "10k",
    "10-q",
    "10q",
    "20-f",
    "sec-filings",
    "sec filings",
    "filings",
    "fiscal",
    "statement",
    "results",
    "reports",
    "report",
    "proxy",
    "balance-sheet",
    "income-statement",
    "cash-flow",
];

/// Investor-relations path segments
///
/// Match either as a `/segment/` component or as the final path component.
pub const IR_SECTION_SLUGS: &[&str] = &[
    "ir",
    "investors",
    "investor",
    "investor-relations",
    "investor-center",
    "investorrelations",
    "financials",
    "financial-information",
    "financial-reports",
    "financial-results",
    "annual-reports",
    "quarterly-results",
    "sec-filings",
    "filings",
    "reports",
    "results",
    "shareholders",
    "shareholder-information",
];

/// Report-titling keywords for the stricter PDF heuristic
pub const PDF_REPORT_KEYWORDS: &[&str] = &[
    "annual report",
    "annual-report",
    "annual_report",
    "annualreport",
    "quarterly report",
    "quarterly-report",
    "interim report",
    "interim-report",
    "financial statement",
    "financial-statement",
    "financial_statement",
    "financial report",
    "financial-report",
    "10-k",
    "10k",
    "10-q",
    "10q",
    "20-f",
    "q1",
    "q2",
    "q3",
    "q4",
    "fiscal year",
    "fiscal-year",
    "fy20",
    "earnings",
    "results",
];

/// True when the URL path ends in `.pdf`, ignoring query and fragment
pub fn has_pdf_extension(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase().ends_with(".pdf"),
        Err(_) => {
            let without_query = url.split(['?', '#']).next().unwrap_or(url);
            without_query.to_ascii_lowercase().ends_with(".pdf")
        }
    }
}

/// True when any keyword occurs in the haystack (already lowercased)
fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// True when one of the IR slugs appears as a path component
fn has_ir_section(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => return false,
    };
    let trimmed = path.trim_end_matches('/');
    IR_SECTION_SLUGS.iter().any(|slug| {
        path.contains(&format!("/{slug}/")) || trimmed.ends_with(&format!("/{slug}"))
    })
}

/// Decide whether a link is worth following or reporting
///
/// True if the URL is a PDF, contains a financial keyword, has an
/// investor-relations path segment, or the anchor text contains a financial
/// keyword.
pub fn is_financial_related(url: &str, text: Option<&str>) -> bool {
    if has_pdf_extension(url) {
        return true;
    }

    let url_lower = url.to_ascii_lowercase();
    if contains_any(&url_lower, FINANCIAL_KEYWORDS) || has_ir_section(url) {
        return true;
    }

    text.map(|t| contains_any(&t.to_lowercase(), FINANCIAL_KEYWORDS))
        .unwrap_or(false)
}

/// Decide whether a link probably points at a financial report PDF
///
/// Requires a `.pdf` extension and a report-titling keyword in the URL or
/// the anchor text.
pub fn is_likely_financial_pdf(url: &str, text: Option<&str>) -> bool {
    if !has_pdf_extension(url) {
        return false;
    }

    if contains_any(&url.to_ascii_lowercase(), PDF_REPORT_KEYWORDS) {
        return true;
    }

    text.map(|t| contains_any(&t.to_lowercase(), PDF_REPORT_KEYWORDS))
        .unwrap_or(false)
}
