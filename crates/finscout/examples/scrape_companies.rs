//! Example: Scrape a few company websites and print the confirmed reports
//!
//! Run with: cargo run -p finscout --example scrape_companies
//!
//! Pass company URLs as arguments to scrape other sites. Set
//! `RUST_LOG=finscout=debug` to watch the crawl.

use finscout::{Scout, ScrapeRequest};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Sites scraped when no arguments are given
const DEFAULT_COMPANIES: &[&str] = &["www.apple.com", "investor.nvidia.com", "www.unilever.com"];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let companies: Vec<String> = if args.is_empty() {
        DEFAULT_COMPANIES.iter().map(|s| s.to_string()).collect()
    } else {
        args
    };

    println!("FinScout Company Examples");
    println!("=========================\n");

    let scout = Scout::builder().deadline(Duration::from_secs(120)).build();

    for (i, company) in companies.iter().enumerate() {
        println!("{}. {}", i + 1, company);
        let started = Instant::now();

        let request = ScrapeRequest::new(company.as_str()).max_pages(60).max_depth(3);
        match scout.scrape(request).await {
            Ok(response) => {
                let meta = &response.metadata;
                println!(
                    "   pages: {}, financial links: {}, confirmed PDFs: {}, browser: {} ({:.1}s)",
                    meta.total_pages_scraped,
                    meta.total_financial_urls,
                    meta.total_confirmed_pdfs,
                    meta.used_browser_automation,
                    started.elapsed().as_secs_f64()
                );
                for url in response.confirmed_pdf_urls.iter().take(5) {
                    println!("   - {}", url);
                }
            }
            Err(e) => println!("   error: {}", e),
        }
        println!();
    }
}
