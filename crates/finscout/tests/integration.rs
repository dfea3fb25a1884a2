//! Integration tests for FinScout using wiremock

use async_trait::async_trait;
use finscout::{
    DocumentSink, MemorySink, RendererFactory, Renderer, RetryPolicy, Scout, ScoutBuilder,
    ScrapeError, ScrapeRequest,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Scout with no pacing, no retries and no seed paths
fn quiet_scout() -> ScoutBuilder {
    Scout::builder()
        .pacing(Duration::ZERO, Duration::ZERO)
        .retry(RetryPolicy::none())
        .seed_paths(Vec::<String>::new())
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<!DOCTYPE html><html><head><title>t</title></head><body>{body}</body></html>"),
        "text/html",
    )
}

fn pdf() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7".to_vec(), "application/pdf")
}

async fn mount_get(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

fn request(server: &MockServer) -> ScrapeRequest {
    ScrapeRequest::new(server.uri()).use_browser(false)
}

#[tokio::test]
async fn test_annual_report_link_is_confirmed() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(r#"<a href="/investors/annual-report-2024.pdf">Annual Report</a>"#),
    )
    .await;
    mount_get(&server, "/investors/annual-report-2024.pdf", pdf()).await;

    let resp = quiet_scout().build().scrape(request(&server)).await.unwrap();

    let expected = format!("{}/investors/annual-report-2024.pdf", server.uri());
    assert_eq!(resp.confirmed_pdf_urls, vec![expected.clone()]);
    assert_eq!(resp.financial_pages.len(), 1);
    assert_eq!(resp.financial_pages[0].url, expected);
    assert_eq!(resp.financial_pages[0].text, "Annual Report");
    assert!(resp.financial_pages[0].is_pdf);
    assert_eq!(resp.metadata.total_pages_scraped, 2);
    assert_eq!(resp.metadata.total_confirmed_pdfs, 1);
    assert_eq!(resp.metadata.status, "success");
    assert!(!resp.metadata.used_browser_automation);
}

#[tokio::test]
async fn test_careers_link_is_never_followed() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(
            r#"<a href="/careers">Careers</a>
               <a href="/careers/financial-analyst">Financial Analyst job</a>
               <a href="/investors">Investors</a>"#,
        ),
    )
    .await;
    mount_get(&server, "/investors", html_page("<p>Nothing yet</p>")).await;
    Mock::given(method("GET"))
        .and(path("/careers"))
        .respond_with(html_page("jobs"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/careers/financial-analyst"))
        .respond_with(html_page("job"))
        .expect(0)
        .mount(&server)
        .await;

    let resp = quiet_scout().build().scrape(request(&server)).await.unwrap();

    assert!(resp
        .financial_pages
        .iter()
        .all(|p| !p.url.contains("/careers")));
    assert_eq!(resp.financial_pages.len(), 1);
    assert_eq!(resp.metadata.total_pages_scraped, 2);
}

#[tokio::test]
async fn test_max_depth_zero_visits_root_and_seeds_only() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(r#"<a href="/financials">Financials</a>"#),
    )
    .await;
    mount_get(
        &server,
        "/investors",
        html_page(r#"<a href="/investors/results">Results</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/financials"))
        .respond_with(html_page(""))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/investors/results"))
        .respond_with(html_page(""))
        .expect(0)
        .mount(&server)
        .await;

    let scout = quiet_scout().seed_paths(["/investors"]).build();
    let resp = scout.scrape(request(&server).max_depth(0)).await.unwrap();

    assert_eq!(resp.metadata.total_pages_scraped, 2);
    let urls: Vec<&str> = resp.financial_pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/financials", server.uri()),
            format!("{}/investors/results", server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_timeouts_still_return_well_formed_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page("slow").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let scout = quiet_scout()
        .request_timeout(Duration::from_millis(200))
        .seed_paths(["/investors", "/ir"])
        .build();
    let resp = scout.scrape(request(&server)).await.unwrap();

    assert!(resp.confirmed_pdf_urls.is_empty());
    assert!(resp.financial_pages.is_empty());
    assert_eq!(resp.metadata.total_financial_urls, 0);
    assert_eq!(resp.metadata.total_confirmed_pdfs, 0);
    assert_eq!(resp.metadata.status, "success");
}

#[tokio::test]
async fn test_page_budget_is_shared_with_seeds() {
    let server = MockServer::start().await;
    let links: String = (1..=10)
        .map(|i| format!(r#"<a href="/reports/{i}">Report {i}</a>"#))
        .collect();
    mount_get(&server, "/", html_page(&links)).await;
    for i in 1..=10 {
        mount_get(
            &server,
            &format!("/reports/{i}"),
            html_page(&format!(r#"<a href="/reports/{i}/detail">Detail</a>"#)),
        )
        .await;
    }
    Mock::given(method("GET"))
        .and(path("/investors"))
        .respond_with(html_page(""))
        .expect(0)
        .mount(&server)
        .await;

    let scout = quiet_scout().seed_paths(["/investors"]).build();
    let resp = scout.scrape(request(&server).max_pages(3)).await.unwrap();

    assert_eq!(resp.metadata.total_pages_scraped, 3);
}

#[tokio::test]
async fn test_probable_pdfs_are_verified_with_head() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(
            r#"<a href="/files/annual-report-2024.pdf?v=1">Annual Report 2024</a>
               <a href="/files/annual-report-2023.pdf?v=1">Annual Report 2023</a>
               <a href="/docs/q3-results.pdf">Q3</a>"#,
        ),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/files/annual-report-2024.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/files/annual-report-2023.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    // promoted by extension, never re-checked
    Mock::given(method("HEAD"))
        .and(path("/docs/q3-results.pdf"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf"))
        .expect(0)
        .mount(&server)
        .await;

    let resp = quiet_scout()
        .build()
        .scrape(request(&server).max_depth(0))
        .await
        .unwrap();

    let confirmed: HashSet<&str> = resp.confirmed_pdf_urls.iter().map(String::as_str).collect();
    assert_eq!(confirmed.len(), 2);
    assert!(confirmed.contains(format!("{}/docs/q3-results.pdf", server.uri()).as_str()));
    assert!(confirmed.contains(format!("{}/files/annual-report-2024.pdf?v=1", server.uri()).as_str()));
    assert!(!confirmed.contains(format!("{}/files/annual-report-2023.pdf?v=1", server.uri()).as_str()));

    // still reported as a financial page
    assert_eq!(resp.financial_pages.len(), 3);
}

#[tokio::test]
async fn test_confirmed_pdfs_ranked_reports_first() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(
            r#"<a href="/files/brochure.pdf">Product brochure</a>
               <a href="/files/annual-report-2024.pdf">Annual Report</a>"#,
        ),
    )
    .await;
    mount_get(&server, "/files/brochure.pdf", pdf()).await;
    mount_get(&server, "/files/annual-report-2024.pdf", pdf()).await;

    let resp = quiet_scout().build().scrape(request(&server)).await.unwrap();

    assert_eq!(
        resp.confirmed_pdf_urls,
        vec![
            format!("{}/files/annual-report-2024.pdf", server.uri()),
            format!("{}/files/brochure.pdf", server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_results_are_deduplicated_and_in_scope() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(
            r#"<a href="/investors">Investors</a>
               <a href="/investors#top">Investors</a>
               <a href="https://other-company.org/annual-report.pdf">Partner annual report</a>
               <a href="mailto:ir@example.com">Investor relations email</a>"#,
        ),
    )
    .await;
    mount_get(
        &server,
        "/investors",
        html_page(
            r#"<a href="/annual-report.pdf">Annual Report</a>
               <a href="annual-report.pdf">Annual Report (again)</a>
               <a href="/">Home investors</a>"#,
        ),
    )
    .await;
    mount_get(&server, "/annual-report.pdf", pdf()).await;

    let resp = quiet_scout().build().scrape(request(&server)).await.unwrap();

    let pages: Vec<&str> = resp.financial_pages.iter().map(|p| p.url.as_str()).collect();
    let unique: HashSet<&str> = pages.iter().copied().collect();
    assert_eq!(pages.len(), unique.len());

    let unique_pdfs: HashSet<&String> = resp.confirmed_pdf_urls.iter().collect();
    assert_eq!(resp.confirmed_pdf_urls.len(), unique_pdfs.len());
    assert_eq!(
        resp.confirmed_pdf_urls,
        vec![format!("{}/annual-report.pdf", server.uri())]
    );

    for url in pages.iter().copied().chain(resp.confirmed_pdf_urls.iter().map(String::as_str)) {
        assert!(url.starts_with(&server.uri()), "out of scope: {url}");
    }
}

#[tokio::test]
async fn test_root_pdf_short_circuits() {
    let server = MockServer::start().await;
    mount_get(&server, "/annual-report.pdf", pdf()).await;
    Mock::given(method("GET"))
        .and(path("/investors"))
        .respond_with(html_page(""))
        .expect(0)
        .mount(&server)
        .await;

    let scout = quiet_scout().seed_paths(["/investors"]).build();
    let req = ScrapeRequest::new(format!("{}/annual-report.pdf", server.uri())).use_browser(false);
    let resp = scout.scrape(req).await.unwrap();

    assert_eq!(
        resp.confirmed_pdf_urls,
        vec![format!("{}/annual-report.pdf", server.uri())]
    );
    assert!(resp.financial_pages.is_empty());
    assert_eq!(resp.metadata.total_pages_scraped, 1);
}

#[tokio::test]
async fn test_links_resolve_against_redirect_target() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        ResponseTemplate::new(302).insert_header("Location", "/en/"),
    )
    .await;
    mount_get(
        &server,
        "/en/",
        html_page(r#"<a href="annual-report-2024.pdf">Annual Report</a>"#),
    )
    .await;
    mount_get(&server, "/en/annual-report-2024.pdf", pdf()).await;

    let resp = quiet_scout().build().scrape(request(&server)).await.unwrap();

    let expected = format!("{}/en/annual-report-2024.pdf", server.uri());
    assert_eq!(resp.confirmed_pdf_urls, vec![expected.clone()]);
    assert_eq!(resp.financial_pages.len(), 1);
    assert_eq!(resp.financial_pages[0].url, expected);
    // The redirect target is not a separate page visit
    assert_eq!(resp.metadata.total_pages_scraped, 2);
}

#[tokio::test]
async fn test_unreachable_pdf_link_is_still_promoted() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(r#"<a href="/investors/annual-report-2023.pdf">Annual Report 2023</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/investors/annual-report-2023.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/investors/annual-report-2023.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let resp = quiet_scout().build().scrape(request(&server)).await.unwrap();

    // `.pdf` links are promoted by extension after the walk, without a check
    let expected = format!("{}/investors/annual-report-2023.pdf", server.uri());
    assert_eq!(resp.confirmed_pdf_urls, vec![expected.clone()]);
    assert!(resp.financial_pages[0].is_pdf);
    assert_eq!(resp.metadata.total_pages_scraped, 2);
}

#[tokio::test]
async fn test_scrape_on_spawned_task() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(r#"<a href="/ir/annual-report.pdf?id=7">Annual Report</a>"#),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/ir/annual-report.pdf"))
        .respond_with(pdf())
        .mount(&server)
        .await;

    let scout = quiet_scout().build();
    let req = request(&server);
    let resp = tokio::spawn(async move { scout.scrape(req).await })
        .await
        .expect("scrape task completes")
        .unwrap();

    assert_eq!(
        resp.confirmed_pdf_urls,
        vec![format!("{}/ir/annual-report.pdf?id=7", server.uri())]
    );
}

#[tokio::test]
async fn test_retries_on_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_get(
        &server,
        "/",
        html_page(r#"<a href="/annual-report-2024.pdf">Annual Report</a>"#),
    )
    .await;
    mount_get(&server, "/annual-report-2024.pdf", pdf()).await;

    let scout = quiet_scout()
        .retry(RetryPolicy {
            max_retries: 2,
            backoff_base: Duration::from_millis(10),
        })
        .build();
    let resp = scout.scrape(request(&server)).await.unwrap();

    assert_eq!(resp.confirmed_pdf_urls.len(), 1);
}

#[tokio::test]
async fn test_confirmed_pdfs_are_recorded() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html_page(r#"<a href="/ir/annual-report-2024.pdf">Annual Report</a>"#),
    )
    .await;
    mount_get(&server, "/ir/annual-report-2024.pdf", pdf()).await;

    let sink = Arc::new(MemorySink::new());
    let scout = quiet_scout().sink(sink.clone()).build();
    scout.scrape(request(&server)).await.unwrap();

    let records = sink.list().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].company, "127");
    assert_eq!(records[0].file_name, "annual-report-2024.pdf");
    assert_eq!(
        records[0].source_url,
        format!("{}/ir/annual-report-2024.pdf", server.uri())
    );
}

#[tokio::test]
async fn test_cancelled_scrape_returns_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page(""))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let resp = quiet_scout()
        .build()
        .scrape_with_cancel(request(&server), cancel)
        .await
        .unwrap();

    assert_eq!(resp.metadata.total_pages_scraped, 0);
    assert!(resp.confirmed_pdf_urls.is_empty());
}

#[tokio::test]
async fn test_deadline_stops_crawl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page("slow").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let scout = quiet_scout()
        .request_timeout(Duration::from_secs(30))
        .deadline(Duration::from_millis(300))
        .build();

    let started = Instant::now();
    let resp = scout.scrape(request(&server)).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(resp.financial_pages.is_empty());
}

#[tokio::test]
async fn test_missing_url_is_rejected() {
    let result = quiet_scout().build().scrape(ScrapeRequest::new("")).await;
    assert!(matches!(result, Err(ScrapeError::MissingUrl)));
}

/// Renderer double returning fixed HTML
struct FixedRenderer {
    html: String,
    fail: bool,
    calls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Renderer for FixedRenderer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn render(&self, _url: &str, _timeout: Duration) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ScrapeError::RenderError("browser crashed".to_string()))
        } else {
            Ok(self.html.clone())
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn renderer_factory(
    html: &str,
    fail: bool,
) -> (RendererFactory, Arc<AtomicUsize>, Arc<AtomicBool>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicBool::new(false));
    let html = html.to_string();
    let (c, d) = (calls.clone(), closed.clone());
    let factory: RendererFactory = Arc::new(move || {
        Box::new(FixedRenderer {
            html: html.clone(),
            fail,
            calls: c.clone(),
            closed: d.clone(),
        }) as Box<dyn Renderer>
    });
    (factory, calls, closed)
}

const APP_SHELL: &str =
    r#"<!DOCTYPE html><html><body><div id="root"></div><script src="/app.js"></script></body></html>"#;

#[tokio::test]
async fn test_script_driven_page_is_rendered() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_raw(APP_SHELL, "text/html"),
    )
    .await;
    mount_get(&server, "/investors/annual-report-2024.pdf", pdf()).await;

    let (factory, calls, closed) = renderer_factory(
        r#"<html><body><a href="/investors/annual-report-2024.pdf">Annual Report</a></body></html>"#,
        false,
    );
    let scout = quiet_scout().renderer_factory(factory).build();
    let resp = scout
        .scrape(ScrapeRequest::new(server.uri()))
        .await
        .unwrap();

    assert!(resp.metadata.used_browser_automation);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(
        resp.confirmed_pdf_urls,
        vec![format!("{}/investors/annual-report-2024.pdf", server.uri())]
    );
}

#[tokio::test]
async fn test_render_failure_disables_rendering() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(APP_SHELL, "text/html"))
        .mount(&server)
        .await;

    let (factory, calls, closed) = renderer_factory("", true);
    let scout = quiet_scout()
        .seed_paths(["/investors", "/ir"])
        .renderer_factory(factory)
        .build();
    let resp = scout
        .scrape(ScrapeRequest::new(server.uri()))
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(closed.load(Ordering::SeqCst));
    assert!(!resp.metadata.used_browser_automation);
    assert_eq!(resp.metadata.total_pages_scraped, 3);
}

#[tokio::test]
async fn test_use_browser_false_never_renders() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_raw(APP_SHELL, "text/html"),
    )
    .await;

    let (factory, calls, _closed) = renderer_factory("<html></html>", false);
    let scout = quiet_scout().renderer_factory(factory).build();
    let resp = scout.scrape(request(&server)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!resp.metadata.used_browser_automation);
}
