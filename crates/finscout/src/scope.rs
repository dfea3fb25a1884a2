//! URL normalization and crawl scope
//!
//! Resolves hrefs found on a page into absolute URLs and decides whether a
//! URL belongs to the company site being crawled. Pure string/URL work, no
//! network access.

use url::Url;

/// Path and keyword patterns that are never crawled or reported
///
/// Matched case-insensitively as substrings of the absolute URL.
pub const BLOCKED_PATTERNS: &[&str] = &[
    "/login",
    "/log-in",
    "/signin",
    "/sign-in",
    "/signup",
    "/sign-up",
    "/register",
    "/logout",
    "/my-account",
    "/myaccount",
    "/cart",
    "/checkout",
    "/careers",
    "/jobs",
    "/job-",
    "/privacy",
    "/terms",
    "/legal",
    "/cookie",
    "/accessibility",
    "/contact",
    "/search",
    "facebook.com",
    "twitter.com",
    "linkedin.com",
    "instagram.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
    "glassdoor.com",
];

/// Schemes that never lead to a crawlable page
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "ftp:"];

/// Normalize the root URL a caller supplied
///
/// Trims whitespace, prepends `https://` when no scheme is present and drops
/// the fragment. Returns `None` for empty or unparseable input.
pub fn normalize_root(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    let mut url = Url::parse(&with_scheme).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Resolve an href against the page it was found on
///
/// Protocol-relative links inherit the base scheme, relative links follow
/// RFC 3986 resolution. Fragments are dropped so `#section` anchors do not
/// produce distinct URLs. Malformed input yields `None`.
pub fn normalize(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if IGNORED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

/// Registrable domain of a host: its last two labels
///
/// `ir.example.com` and `www.example.com` both map to `example.com`.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host
    }
}

/// Registrable domain of a URL, if it has a host
pub fn url_registrable_domain(url: &Url) -> Option<String> {
    url.host_str().map(registrable_domain)
}

/// Check whether a URL contains any of the blocked patterns
pub fn is_blocked(url: &str, extra_patterns: &[String]) -> bool {
    let lower = url.to_ascii_lowercase();
    BLOCKED_PATTERNS.iter().any(|p| lower.contains(p))
        || extra_patterns
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_ascii_lowercase()))
}

/// Decide whether a URL is inside the crawl scope
///
/// A URL is in scope when it parses as an absolute http(s) URL, matches no
/// blocked pattern and shares its registrable domain with the root. Sibling
/// subdomains are accepted on purpose.
pub fn is_in_scope(url: &str, root_domain: &str, extra_patterns: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    if is_blocked(url, extra_patterns) {
        return false;
    }
    url_registrable_domain(&parsed).is_some_and(|domain| domain == root_domain)
}

/// Company name derived from a website URL
///
/// Strips `www.` and returns the first host label, e.g.
/// `https://www.acme.com/investors` -> `acme`.
pub fn company_name(company_url: &str) -> Option<String> {
    let url = normalize_root(company_url)?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host.split('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.example.com/investors/index.html").unwrap()
    }

    #[test]
    fn test_normalize_root_adds_scheme() {
        assert_eq!(
            normalize_root("example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_root("  http://example.com/ir#top ").unwrap().as_str(),
            "http://example.com/ir"
        );
        assert!(normalize_root("").is_none());
        assert!(normalize_root("   ").is_none());
        assert!(normalize_root("ftp://example.com").is_none());
    }

    #[test]
    fn test_normalize_relative_links() {
        assert_eq!(
            normalize("annual-report-2024.pdf", &base()),
            Some("https://www.example.com/investors/annual-report-2024.pdf".to_string())
        );
        assert_eq!(
            normalize("/financials", &base()),
            Some("https://www.example.com/financials".to_string())
        );
        assert_eq!(
            normalize("../about", &base()),
            Some("https://www.example.com/about".to_string())
        );
    }

    #[test]
    fn test_normalize_protocol_relative() {
        let http_base = Url::parse("http://example.com/").unwrap();
        assert_eq!(
            normalize("//ir.example.com/reports", &http_base),
            Some("http://ir.example.com/reports".to_string())
        );
    }

    #[test]
    fn test_normalize_rejects_non_pages() {
        assert_eq!(normalize("", &base()), None);
        assert_eq!(normalize("#top", &base()), None);
        assert_eq!(normalize("javascript:void(0)", &base()), None);
        assert_eq!(normalize("mailto:ir@example.com", &base()), None);
        assert_eq!(normalize("tel:+15555555555", &base()), None);
    }

    #[test]
    fn test_normalize_drops_fragment() {
        assert_eq!(
            normalize("/reports#2024", &base()),
            Some("https://www.example.com/reports".to_string())
        );
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("ir.example.com"), "example.com");
        assert_eq!(registrable_domain("www.EXAMPLE.com."), "example.com");
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("localhost"), "localhost");
    }

    #[test]
    fn test_is_in_scope() {
        let root = "example.com";
        assert!(is_in_scope("https://example.com/investors", root, &[]));
        assert!(is_in_scope("https://ir.example.com/reports", root, &[]));
        assert!(!is_in_scope("https://other.com/investors", root, &[]));
        assert!(!is_in_scope("https://example.com/careers", root, &[]));
        assert!(!is_in_scope("https://example.com/login?next=/", root, &[]));
        assert!(!is_in_scope("not a url", root, &[]));
    }

    #[test]
    fn test_extra_block_patterns() {
        let extra = vec!["/News/".to_string()];
        assert!(is_in_scope("https://example.com/news/", "example.com", &[]));
        assert!(!is_in_scope("https://example.com/news/", "example.com", &extra));
    }

    #[test]
    fn test_company_name() {
        assert_eq!(company_name("https://www.acme.com/ir"), Some("acme".to_string()));
        assert_eq!(company_name("acme.co.uk"), Some("acme".to_string()));
        assert_eq!(company_name(""), None);
    }
}
