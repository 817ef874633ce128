use std::time::Duration;

/// Fixed identifiers and endpoints for the one search this tool targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfig {
    /// Irkutsk oblast
    pub location_id: u32,
    /// Apartments
    pub category_id: u32,
    pub base_url: String,
    pub items_api: String,
    /// Human-facing catalog page the browser opens first to pick up cookies.
    pub catalog_url: String,
    pub referer: String,
    pub user_agent: String,
    /// Path under `base_url` used to build a listing URL from a bare id.
    pub listing_path: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            location_id: 628780,
            category_id: 24,
            base_url: "https://www.avito.ru".to_string(),
            items_api: "https://www.avito.ru/web/1/js/items".to_string(),
            catalog_url: "https://www.avito.ru/irkutskaya_oblast/kvartiry/sdam/posutochno".to_string(),
            referer: "https://www.avito.ru/irkutskaya_oblast/kvartiry/sdam/posutochno/-ASgBAgICAkSSA8gQ8AeSUg".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36".to_string(),
            listing_path: "/irkutskaya_oblast/kvartiry/sdam/posutochno".to_string(),
        }
    }
}

impl MarketConfig {
    /// Same deployment, served from another host (used against mock servers).
    pub fn with_host(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let defaults = Self::default();
        Self {
            base_url: host.to_string(),
            items_api: format!("{}/web/1/js/items", host),
            catalog_url: format!("{}{}", host, defaults.listing_path),
            referer: format!("{}{}", host, defaults.listing_path),
            ..defaults
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    pub direct_max_attempts: u32,
    /// Wait before retry `n` is `n * direct_backoff_step`.
    pub direct_backoff_step: Duration,
    pub browser_rate_limit_wait: Duration,
    /// `None` keeps retrying a rate-limited page until cancelled.
    pub browser_max_rate_limit_retries: Option<u32>,
    pub request_timeout: Duration,
    pub navigation_timeout: Duration,
    pub navigation_settle: Duration,
    pub direct_page_delay: Duration,
    pub browser_page_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            direct_max_attempts: 4,
            direct_backoff_step: Duration::from_secs(10),
            browser_rate_limit_wait: Duration::from_secs(15),
            browser_max_rate_limit_retries: None,
            request_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
            navigation_settle: Duration::from_secs(2),
            direct_page_delay: Duration::from_millis(500),
            browser_page_delay: Duration::from_secs(1),
        }
    }
}

impl Timings {
    /// No waiting anywhere; retry counts are unchanged.
    pub fn immediate() -> Self {
        Self {
            direct_backoff_step: Duration::ZERO,
            browser_rate_limit_wait: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            navigation_timeout: Duration::from_secs(5),
            navigation_settle: Duration::ZERO,
            direct_page_delay: Duration::ZERO,
            browser_page_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}
