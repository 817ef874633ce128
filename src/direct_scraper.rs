use crate::common_scraper::{pause, FetchTransport, FetchedPage};
use crate::config::{MarketConfig, Timings};
use crate::error::FetchError;
use crate::models::PageRequest;
use crate::{debug, debug_println, params};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Calls the items API straight from this process, posing as a browser tab.
pub struct DirectScraper {
    client: Client,
    config: MarketConfig,
    timings: Timings,
    debug_dir: PathBuf,
    cancel: CancellationToken,
}

impl DirectScraper {
    pub fn new(
        config: MarketConfig,
        timings: Timings,
        cookies: Option<&BTreeMap<String, String>>,
        debug_dir: PathBuf,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let jar = Jar::default();
        if let Some(cookies) = cookies {
            let base: Url = config.base_url.parse().context("Invalid base URL")?;
            for (name, value) in cookies {
                jar.add_cookie_str(&format!("{}={}", name, value), &base);
            }
            debug_println!("Loaded {} cookies for {}", cookies.len(), base);
        }

        let client = Client::builder()
            .default_headers(browser_headers(&config)?)
            .cookie_provider(Arc::new(jar))
            .timeout(timings.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            timings,
            debug_dir,
            cancel,
        })
    }

    fn report_non_json(&self, page: usize, content_type: &str, body: &[u8]) {
        println!("  Response is not JSON ({}), the site is probably blocking us", content_type);
        let html = String::from_utf8_lossy(body);
        if let Some(title) = debug::page_title(&html) {
            println!("  Page title: {}", title);
        }
        if debug::should_dump(page) {
            match debug::dump_html(&self.debug_dir, body) {
                Ok(path) => println!("  Saved a fragment of the response to {}", path.display()),
                Err(e) => eprintln!("  Failed to save the response: {}", e),
            }
        }
    }
}

/// The endpoint only serves JSON to requests that look like the site's own XHR.
fn browser_headers(config: &MarketConfig) -> Result<HeaderMap> {
    let pairs: [(&'static str, &str); 14] = [
        ("accept", "application/json"),
        ("accept-language", "en-US,en;q=0.9,ru-RU;q=0.8,ru;q=0.7"),
        ("cache-control", "no-cache"),
        ("pragma", "no-cache"),
        ("referer", config.referer.as_str()),
        ("sec-ch-ua", r#""Not(A:Brand";v="8", "Chromium";v="144", "Google Chrome";v="144""#),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", r#""Windows""#),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-origin"),
        ("user-agent", config.user_agent.as_str()),
        ("x-requested-with", "XMLHttpRequest"),
        ("x-source", "client-browser"),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value).context(format!("Invalid value for header {}", name))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl FetchTransport for DirectScraper {
    fn name(&self) -> &str {
        "direct HTTP"
    }

    fn page_delay(&self) -> Duration {
        self.timings.direct_page_delay
    }

    async fn fetch_page(&mut self, request: &PageRequest) -> Result<FetchedPage, FetchError> {
        let url = params::page_url(&self.config, request);
        let max_attempts = self.timings.direct_max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug_println!("GET {} (attempt {}/{})", url, attempt, max_attempts);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if debug::is_debug_enabled() || status != StatusCode::OK {
                println!("  HTTP {}, Content-Type: {}", status.as_u16(), content_type);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == max_attempts {
                    break;
                }
                let wait = self.timings.direct_backoff_step * attempt;
                println!("  429 Too Many Requests. Waiting {}s before retrying...", wait.as_secs());
                pause(wait, &self.cancel).await?;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Http { status: status.as_u16() });
            }

            if !content_type.contains("json") {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| FetchError::Transport(e.to_string()))?;
                self.report_non_json(request.page, &content_type, &body);
                return Ok(FetchedPage {
                    body: serde_json::Value::Null,
                    status: status.as_u16(),
                });
            }

            let body = response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| FetchError::Malformed(e.to_string()))?;
            return Ok(FetchedPage {
                body,
                status: status.as_u16(),
            });
        }

        Err(FetchError::RetriesExhausted {
            attempts: max_attempts,
        })
    }
}
