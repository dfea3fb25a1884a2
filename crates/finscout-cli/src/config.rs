//! Environment configuration for the service

use finscout::{DocumentSink, RenderConfig, Scout, ScoutBuilder, ScrapeError, SerpApiSearch};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
const DEFAULT_MAX_CONCURRENCY: usize = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Service configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    pub serpapi_api_key: Option<String>,
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub scrape_deadline: Option<Duration>,
    pub chrome_path: Option<PathBuf>,
    pub chrome_remote_url: Option<String>,
    pub database_url: Option<String>,
}

impl Config {
    /// Load configuration from the process environment and `.env`
    pub fn from_env() -> Self {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind = parse_or(var("FINSCOUT_BIND"), "FINSCOUT_BIND", default_bind());
        let max_concurrency = parse_or(
            var("FINSCOUT_MAX_CONCURRENCY"),
            "FINSCOUT_MAX_CONCURRENCY",
            DEFAULT_MAX_CONCURRENCY,
        )
        .max(1);
        let timeout_secs = parse_or(
            var("FINSCOUT_REQUEST_TIMEOUT_SECS"),
            "FINSCOUT_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );
        let scrape_deadline = var("FINSCOUT_SCRAPE_DEADLINE_SECS").and_then(|raw| {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    warn!(value = %raw, "Invalid FINSCOUT_SCRAPE_DEADLINE_SECS, no deadline");
                    None
                }
            }
        });

        Self {
            bind,
            serpapi_api_key: var("SERPAPI_API_KEY"),
            max_concurrency,
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            scrape_deadline,
            chrome_path: var("FINSCOUT_CHROME_PATH").map(PathBuf::from),
            chrome_remote_url: var("FINSCOUT_CHROME_REMOTE_URL"),
            database_url: var("DATABASE_URL"),
        }
    }

    /// Scout builder carrying this configuration
    pub fn scout_builder(&self) -> ScoutBuilder {
        let mut builder = Scout::builder()
            .max_concurrency(self.max_concurrency)
            .request_timeout(self.request_timeout)
            .render_config(RenderConfig {
                chrome_path: self.chrome_path.clone(),
                remote_url: self.chrome_remote_url.clone(),
                ..Default::default()
            });
        if let Some(deadline) = self.scrape_deadline {
            builder = builder.deadline(deadline);
        }
        if let Some(ref key) = self.serpapi_api_key {
            match SerpApiSearch::new(key.clone(), Duration::from_secs(30)) {
                Ok(search) => builder = builder.search_provider(Arc::new(search)),
                Err(e) => warn!(error = %e, "Search client unavailable"),
            }
        }
        builder
    }

    /// Durable document store, when `DATABASE_URL` is set
    pub async fn document_store(&self) -> Result<Option<Arc<dyn DocumentSink>>, ScrapeError> {
        match self.database_url.as_deref() {
            Some(url) => connect_store(url).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(feature = "postgres")]
async fn connect_store(url: &str) -> Result<Arc<dyn DocumentSink>, ScrapeError> {
    let sink = finscout::PostgresSink::connect(url).await?;
    Ok(Arc::new(sink))
}

#[cfg(not(feature = "postgres"))]
async fn connect_store(_url: &str) -> Result<Arc<dyn DocumentSink>, ScrapeError> {
    Err(ScrapeError::StoreError(
        "DATABASE_URL is set but this build has no postgres support".to_string(),
    ))
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn default_bind() -> SocketAddr {
    DEFAULT_BIND
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000)))
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &str, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Invalid value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.max_concurrency, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.serpapi_api_key.is_none());
        assert!(config.scrape_deadline.is_none());
        assert!(config.chrome_path.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_values_from_env() {
        let config = config(&[
            ("FINSCOUT_BIND", "127.0.0.1:8080"),
            ("SERPAPI_API_KEY", "secret"),
            ("FINSCOUT_MAX_CONCURRENCY", "8"),
            ("FINSCOUT_REQUEST_TIMEOUT_SECS", "20"),
            ("FINSCOUT_SCRAPE_DEADLINE_SECS", "90"),
            ("FINSCOUT_CHROME_PATH", "/usr/bin/chromium"),
            ("FINSCOUT_CHROME_REMOTE_URL", "ws://localhost:9222"),
            ("DATABASE_URL", "postgres://localhost/financial_files"),
        ]);
        assert_eq!(config.bind.to_string(), "127.0.0.1:8080");
        assert_eq!(config.serpapi_api_key.as_deref(), Some("secret"));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.scrape_deadline, Some(Duration::from_secs(90)));
        assert_eq!(config.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.chrome_remote_url.as_deref(), Some("ws://localhost:9222"));
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/financial_files")
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("FINSCOUT_BIND", "not-an-address"),
            ("FINSCOUT_MAX_CONCURRENCY", "lots"),
            ("FINSCOUT_REQUEST_TIMEOUT_SECS", "-1"),
            ("FINSCOUT_SCRAPE_DEADLINE_SECS", "0"),
            ("SERPAPI_API_KEY", "   "),
        ]);
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.max_concurrency, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.scrape_deadline.is_none());
        assert!(config.serpapi_api_key.is_none());
    }

    #[test]
    fn test_scout_builder_enables_search_with_key() {
        let scout = config(&[("SERPAPI_API_KEY", "secret")]).scout_builder().build();
        assert!(scout.has_search());
        assert_eq!(scout.options().max_concurrency, 5);

        let scout = Config::default().scout_builder().build();
        assert!(!scout.has_search());
    }

    #[tokio::test]
    async fn test_document_store() {
        assert!(Config::default().document_store().await.unwrap().is_none());

        // Unreachable or unsupported stores are reported, never replaced silently
        let config = config(&[("DATABASE_URL", "not-a-database-url")]);
        assert!(matches!(
            config.document_store().await,
            Err(ScrapeError::StoreError(_))
        ));
    }
}
