pub mod browser_scraper;
pub mod common_scraper;
pub mod config;
pub mod debug;
pub mod direct_scraper;
pub mod error;
pub mod extractor;
pub mod models;
pub mod params;
pub mod parser;
pub mod scrapers;
pub mod tui;
pub mod utils;
