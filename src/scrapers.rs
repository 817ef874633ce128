pub use crate::browser_scraper::{BrowserScraper, BrowserSession, ChromiumSession};
pub use crate::direct_scraper::DirectScraper;
