//! FinScout CLI - find financial statements on company websites

mod config;
mod server;

use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use finscout::{
    download_documents, DocumentSink, DownloadReport, MemorySink, ReqwestTransport, RetryPolicy,
    ScrapeRequest, ScrapeResponse, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, TOOL_LLMTXT,
};
use server::AppState;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Output format for the scrape subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown report with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// FinScout - targeted crawler for company financial statements
#[derive(Parser, Debug)]
#[command(name = "finscout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,

    /// Print the request and response JSON schemas
    #[arg(long)]
    schema: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a company website and report financial statement PDFs
    Scrape {
        /// Company website, e.g. example.com
        company_url: String,

        /// Page budget shared by all crawls
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        /// Link depth from the root or a seed path
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Never render pages in a headless browser
        #[arg(long)]
        no_browser: bool,

        /// Stop crawling after this many seconds
        #[arg(long)]
        deadline: Option<u64>,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,

        /// Custom User-Agent
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Look up a company's financial statement PDF through the search engine
    Search {
        /// Company name
        company: String,

        /// Fiscal year to search for
        #[arg(long)]
        year: Option<u32>,
    },
    /// Download a company's recorded reports (needs DATABASE_URL)
    Download {
        /// Company name as recorded, e.g. example
        company: String,

        /// Directory that receives one folder per company
        #[arg(long, default_value = "reports")]
        out: PathBuf,
    },
    /// Serve the HTTP endpoints
    Serve {
        /// Address to bind, overrides FINSCOUT_BIND
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle --llmtxt flag
    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    let config = Config::from_env();

    if cli.schema {
        let scout = config.scout_builder().build();
        let schemas = serde_json::json!({
            "input": scout.input_schema(),
            "output": scout.output_schema(),
        });
        writeln_safe(&serde_json::to_string_pretty(&schemas).unwrap_or_default());
        std::process::exit(0);
    }

    match cli.command {
        Some(Commands::Scrape {
            company_url,
            max_pages,
            max_depth,
            no_browser,
            deadline,
            output,
            user_agent,
        }) => {
            let mut request = ScrapeRequest::new(company_url)
                .max_pages(max_pages)
                .max_depth(max_depth)
                .use_browser(!no_browser);
            if let Some(secs) = deadline {
                request = request.deadline_secs(secs);
            }
            run_scrape(&config, request, output, user_agent).await;
        }
        Some(Commands::Search { company, year }) => {
            run_search(&config, &company, year).await;
        }
        Some(Commands::Download { company, out }) => {
            run_download(&config, &company, &out).await;
        }
        Some(Commands::Serve { bind }) => {
            let sink: Arc<dyn DocumentSink> = match open_store(&config).await {
                Some(store) => store,
                None => Arc::new(MemorySink::new()),
            };
            let state = AppState {
                scout: config.scout_builder().sink(sink.clone()).build(),
                sink,
            };
            let addr = bind.unwrap_or(config.bind);
            if let Err(e) = server::serve(addr, state).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            eprintln!("Usage: finscout scrape <COMPANY_URL>");
            eprintln!("   or: finscout search <COMPANY>");
            eprintln!("   or: finscout download <COMPANY>");
            eprintln!("   or: finscout serve");
            eprintln!("   or: finscout --help");
            std::process::exit(1);
        }
    }
}

async fn run_scrape(
    config: &Config,
    request: ScrapeRequest,
    output: OutputFormat,
    user_agent: Option<String>,
) {
    let mut builder = config.scout_builder();
    if let Some(store) = open_store(config).await {
        builder = builder.sink(store);
    }
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let scout = builder.build();

    match scout.scrape(request).await {
        Ok(response) => match output {
            OutputFormat::Md => writeln_safe(&format_md_report(&response)),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&response).unwrap_or_else(|e| {
                    eprintln!("Error serializing response: {}", e);
                    std::process::exit(1);
                });
                writeln_safe(&json);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_search(config: &Config, company: &str, year: Option<u32>) {
    let mut builder = config.scout_builder();
    if let Some(store) = open_store(config).await {
        builder = builder.sink(store);
    }
    let scout = builder.build();
    match scout.search_financial_statement(company, year).await {
        Ok(Some(url)) => writeln_safe(&url),
        Ok(None) => {
            eprintln!("No suitable PDF found for {}", company);
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_download(config: &Config, company: &str, out: &Path) {
    let Some(store) = open_store(config).await else {
        eprintln!("Error: DATABASE_URL is not set, no recorded documents to download");
        std::process::exit(1);
    };
    let records = store.list_company(company).await;
    if records.is_empty() {
        eprintln!("No PDF files found for company: {}", company);
        std::process::exit(2);
    }

    let transport = match ReqwestTransport::new(config.request_timeout, RetryPolicy::default(), None)
    {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    match download_documents(&transport, &records, out).await {
        Ok(report) => {
            writeln_safe(&format_download_report(&report));
            if report.saved.is_empty() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Connect the configured document store; exits when it is unusable
async fn open_store(config: &Config) -> Option<Arc<dyn DocumentSink>> {
    match config.document_store().await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn format_download_report(report: &DownloadReport) -> String {
    let mut output = String::new();
    for path in &report.saved {
        output.push_str(&format!("saved  {}\n", path.display()));
    }
    for (url, error) in &report.failed {
        output.push_str(&format!("failed {} ({})\n", url, error));
    }
    output.push_str(&format!(
        "{} saved, {} failed",
        report.saved.len(),
        report.failed.len()
    ));
    output
}

/// Format a scrape result as markdown with YAML frontmatter
fn format_md_report(response: &ScrapeResponse) -> String {
    let meta = &response.metadata;
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("company_url: {}\n", response.company_url));
    output.push_str(&format!("pages_scraped: {}\n", meta.total_pages_scraped));
    output.push_str(&format!("financial_urls: {}\n", meta.total_financial_urls));
    output.push_str(&format!("confirmed_pdfs: {}\n", meta.total_confirmed_pdfs));
    if meta.used_browser_automation {
        output.push_str("used_browser_automation: true\n");
    }
    output.push_str("---\n");

    output.push_str("\n## Confirmed PDFs\n\n");
    if response.confirmed_pdf_urls.is_empty() {
        output.push_str("_None found_\n");
    }
    for url in &response.confirmed_pdf_urls {
        output.push_str(&format!("- {}\n", url));
    }

    output.push_str("\n## Financial pages\n\n");
    if response.financial_pages.is_empty() {
        output.push_str("_None found_\n");
    }
    for page in &response.financial_pages {
        let text = if page.text.is_empty() { &page.url } else { &page.text };
        let marker = if page.is_pdf { " (PDF)" } else { "" };
        output.push_str(&format!("- [{}]({}){}\n", text, page.url, marker));
    }

    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
