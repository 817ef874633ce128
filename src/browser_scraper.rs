//! Fetches listing pages from inside a real browser tab, so requests carry
//! the site's own cookies and fingerprint instead of ours.

use crate::common_scraper::{pause, FetchTransport, FetchedPage};
use crate::config::{MarketConfig, Timings};
use crate::error::FetchError;
use crate::models::PageRequest;
use crate::{debug_eprintln, debug_println, params};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Top-level key every genuine items response carries.
const MARKER_KEY: &str = "catalog";

/// Runs in the page; resolves to the decoded JSON, or `{_status}` on a non-2xx.
const FETCH_SCRIPT: &str = r#"async (url) => {
    const r = await fetch(url, {
        headers: { 'accept': 'application/json', 'x-requested-with': 'XMLHttpRequest' }
    });
    if (!r.ok) return { _status: r.status };
    return await r.json();
}"#;

/// What the transport needs from a live browser tab.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;
    /// Calls the JS `function` with `arg` and returns its (awaited) result.
    async fn evaluate(&mut self, function: &str, arg: Value) -> Result<Value>;
    async fn close(&mut self) -> Result<()>;
}

pub struct BrowserScraper<S: BrowserSession> {
    session: S,
    config: MarketConfig,
    timings: Timings,
    cancel: CancellationToken,
    closed: bool,
}

impl<S: BrowserSession> BrowserScraper<S> {
    /// Opens the catalog page first so the site sets its cookies and
    /// anti-bot tokens. The session is closed if that fails.
    pub async fn open(
        mut session: S,
        config: MarketConfig,
        timings: Timings,
        cancel: CancellationToken,
    ) -> Result<Self> {
        println!("Opening the catalog page...");
        if let Err(e) = session.navigate(&config.catalog_url, timings.navigation_timeout).await {
            session.close().await.ok();
            return Err(e.context(format!("Failed to open catalog page {}", config.catalog_url)));
        }
        if pause(timings.navigation_settle, &cancel).await.is_err() {
            session.close().await.ok();
            return Err(anyhow!("cancelled while waiting for the catalog page"));
        }
        println!("If the browser shows an access block, press \"Continue\" there and solve the captcha.");

        Ok(Self {
            session,
            config,
            timings,
            cancel,
            closed: false,
        })
    }
}

#[async_trait]
impl<S: BrowserSession> FetchTransport for BrowserScraper<S> {
    fn name(&self) -> &str {
        "browser"
    }

    fn page_delay(&self) -> Duration {
        self.timings.browser_page_delay
    }

    async fn fetch_page(&mut self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        let url = params::page_url(&self.config, request);
        let mut rate_limited: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            debug_println!("In-page fetch {}", url);
            let data = self
                .session
                .evaluate(FETCH_SCRIPT, json!(url))
                .await
                .map_err(|e| FetchError::Transport(format!("{:#}", e)))?;

            let status = data
                .get("_status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok());

            if status == Some(429) {
                rate_limited += 1;
                if let Some(max) = self.timings.browser_max_rate_limit_retries {
                    if rate_limited > max {
                        return Err(FetchError::RetriesExhausted {
                            attempts: rate_limited,
                        });
                    }
                }
                println!(
                    "  429 - waiting {}s and retrying...",
                    self.timings.browser_rate_limit_wait.as_secs()
                );
                pause(self.timings.browser_rate_limit_wait, &self.cancel).await?;
                continue;
            }

            if data.get(MARKER_KEY).is_none() {
                if request.page == 1 {
                    println!("  No data (probably blocked, or the API changed).");
                }
                return Err(match status {
                    Some(status) => FetchError::Http { status },
                    None => FetchError::Malformed(format!("response has no `{}` key", MARKER_KEY)),
                });
            }

            return Ok(FetchedPage {
                body: data,
                status: status.unwrap_or(200),
            });
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session.close().await
    }
}

/// Chromium driven over CDP.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    pub async fn launch(headless: bool, user_agent: &str) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .arg(format!("--user-agent={}", user_agent))
            .arg("--lang=ru-RU")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug_eprintln!("Browser handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(anyhow!("navigation failed: {e}")),
            Err(_) => Err(anyhow!("navigation timed out after {}s", timeout.as_secs())),
        }
    }

    async fn evaluate(&mut self, function: &str, arg: Value) -> Result<Value> {
        let expression = format!("({})({})", function.trim(), serde_json::to_string(&arg)?);
        let result = self
            .page
            .evaluate_expression(expression)
            .await
            .context("JS execution failed")?;
        result
            .into_value::<Value>()
            .map_err(|e| anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self.browser.close().await;
        self.browser.wait().await.ok();
        self.handler_task.abort();
        closed.map(|_| ()).context("failed to close browser")
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
