//! Headless Chrome renderer for script-driven pages
//!
//! The browser is launched (or connected to) lazily on the first render and
//! torn down in `close`. One renderer serves one crawl session.

use std::path::PathBuf;
use std::time::Duration;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Chrome executable; well-known install paths are searched when unset
    pub chrome_path: Option<PathBuf>,
    /// Remote DevTools URL (e.g. `ws://localhost:9222`); skips launching
    pub remote_url: Option<String>,
    /// Run without a visible window
    pub headless: bool,
    /// Extra wait after navigation for client-side rendering to settle
    pub settle_delay: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            remote_url: None,
            headless: true,
            settle_delay: Duration::from_secs(2),
        }
    }
}

#[cfg(feature = "browser")]
pub use chrome::ChromeRenderer;

#[cfg(feature = "browser")]
mod chrome {
    use super::RenderConfig;
    use crate::error::ScrapeError;
    use crate::fetchers::Renderer;
    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig};
    use futures::StreamExt;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    /// Common Chrome executable paths to check
    const CHROME_PATHS: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    struct RunningBrowser {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    /// chromiumoxide-backed renderer
    pub struct ChromeRenderer {
        config: RenderConfig,
        running: Mutex<Option<RunningBrowser>>,
    }

    impl ChromeRenderer {
        /// Create a renderer; nothing is launched until the first render
        pub fn new(config: RenderConfig) -> Self {
            Self {
                config,
                running: Mutex::new(None),
            }
        }

        fn find_chrome(&self) -> Result<PathBuf, ScrapeError> {
            if let Some(ref path) = self.config.chrome_path {
                return Ok(path.clone());
            }
            CHROME_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
                .ok_or_else(|| {
                    ScrapeError::RenderError("Chrome/Chromium executable not found".to_string())
                })
        }

        async fn start(&self) -> Result<RunningBrowser, ScrapeError> {
            let (browser, mut handler) = match self.config.remote_url {
                Some(ref remote) => {
                    info!(url = %remote, "Connecting to remote browser");
                    Browser::connect(remote.clone())
                        .await
                        .map_err(|e| ScrapeError::RenderError(format!("connect failed: {e}")))?
                }
                None => {
                    let chrome = self.find_chrome()?;
                    info!(chrome = %chrome.display(), headless = self.config.headless, "Launching browser");

                    let mut builder = BrowserConfig::builder().chrome_executable(chrome);
                    if !self.config.headless {
                        builder = builder.with_head();
                    }
                    let config = builder
                        .arg("--disable-blink-features=AutomationControlled")
                        .arg("--disable-dev-shm-usage")
                        .arg("--no-first-run")
                        .arg("--no-default-browser-check")
                        .arg("--no-sandbox")
                        .arg("--disable-gpu")
                        .build()
                        .map_err(ScrapeError::RenderError)?;

                    Browser::launch(config)
                        .await
                        .map_err(|e| ScrapeError::RenderError(format!("launch failed: {e}")))?
                }
            };

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(RunningBrowser { browser, handler })
        }
    }

    #[async_trait]
    impl Renderer for ChromeRenderer {
        fn name(&self) -> &'static str {
            "chrome"
        }

        async fn render(&self, url: &str, timeout: Duration) -> Result<String, ScrapeError> {
            let mut running = self.running.lock().await;
            if running.is_none() {
                *running = Some(self.start().await?);
            }
            let browser = &running
                .as_ref()
                .ok_or_else(|| ScrapeError::RenderError("browser not running".to_string()))?
                .browser;

            let page = tokio::time::timeout(timeout, browser.new_page(url))
                .await
                .map_err(|_| ScrapeError::RenderError("page load timed out".to_string()))?
                .map_err(|e| ScrapeError::RenderError(format!("failed to open page: {e}")))?;

            // Navigation may already be complete; a timeout here is not fatal.
            let _ = tokio::time::timeout(timeout, page.wait_for_navigation()).await;
            tokio::time::sleep(self.config.settle_delay).await;

            let html = page
                .content()
                .await
                .map_err(|e| ScrapeError::RenderError(format!("failed to read content: {e}")));

            if let Err(e) = page.close().await {
                debug!(url, error = %e, "Page close error");
            }
            html
        }

        async fn close(&self) {
            let Some(mut running) = self.running.lock().await.take() else {
                return;
            };
            if let Err(e) = running.browser.close().await {
                warn!(error = %e, "Browser close error");
            }
            let _ = running.browser.wait().await;
            running.handler.abort();
            info!("Browser released");
        }
    }
}
