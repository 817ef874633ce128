use crate::config::MarketConfig;
use crate::error::FetchError;
use crate::extractor::{self, is_truthy};
use crate::models::{NormalizedRecord, PageRequest, PageResult, SearchWindow};
use crate::tui::ScraperTUI;
use crate::{debug, debug_println, parser, utils};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pages with at least this many listings are assumed to have a successor
/// when the body carries no usable counters.
pub const FULL_PAGE_HINT: usize = 50;

const TOTAL_KEYS: [&str; 3] = ["totalCount", "count", "mainCount"];
const PER_PAGE_KEYS: [&str; 2] = ["itemsOnPage", "itemsOnPageMainSection"];

#[derive(Debug, Clone)]
pub struct ScrapingOptions {
    pub output_file: PathBuf,
    pub max_pages: usize,
    pub window: SearchWindow,
    pub debug_dir: PathBuf,
    pub cancel: CancellationToken,
}

impl Default for ScrapingOptions {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("output/avito_apartments.csv"),
            max_pages: 100,
            window: SearchWindow::default(),
            debug_dir: PathBuf::from("output"),
            cancel: CancellationToken::new(),
        }
    }
}

/// One decoded page as the transport saw it. `body` is `Null` when the
/// endpoint answered with something other than JSON.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: Value,
    pub status: u16,
}

/// Fetches one page of listings, retrying rate-limited attempts internally.
#[async_trait]
pub trait FetchTransport: Send {
    fn name(&self) -> &str;
    /// Pause between consecutive pages.
    fn page_delay(&self) -> Duration;
    async fn fetch_page(&mut self, request: &PageRequest) -> Result<FetchedPage, FetchError>;
    /// Releases whatever the transport holds. Called once at the end of every run.
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoMorePages,
    EmptyPage,
    PageLimit,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(StopReason),
    Aborted(FetchError),
}

#[derive(Debug)]
pub struct ScrapingResult {
    pub records: Vec<NormalizedRecord>,
    pub pages_fetched: usize,
    pub outcome: RunOutcome,
}

impl ScrapingResult {
    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted(_))
    }
}

/// Walks the result pages through `transport` until the listings run out,
/// a page fails, or `max_pages` is reached. Never fails: every error becomes
/// an aborted outcome carrying whatever was collected so far.
pub async fn run_scraper_with_options<T: FetchTransport + ?Sized>(
    transport: &mut T,
    config: &MarketConfig,
    options: &ScrapingOptions,
    mut tui: Option<&mut ScraperTUI>,
) -> ScrapingResult {
    let mut records: Vec<NormalizedRecord> = Vec::new();
    let mut context: Option<String> = None;
    let mut pages_fetched = 0;
    let mut page = 1;

    let outcome = loop {
        if page > options.max_pages {
            break RunOutcome::Completed(StopReason::PageLimit);
        }
        if options.cancel.is_cancelled() {
            break RunOutcome::Aborted(FetchError::Cancelled);
        }

        if let Some(tui) = tui.as_deref_mut() {
            tui.start_page(page, options.max_pages).ok();
        }

        let request = PageRequest {
            page,
            window: options.window,
            context: context.take(),
        };
        let fetched = match transport.fetch_page(&request).await {
            Ok(fetched) => fetched,
            Err(e) => {
                if let Some(tui) = tui.as_deref_mut() {
                    tui.fail_page(page, &e).ok();
                }
                break RunOutcome::Aborted(e);
            }
        };
        pages_fetched += 1;

        let result = read_page(&fetched.body, page, config, options);
        if result.records.is_empty() {
            if page == 1 {
                println!("No listings found. Check the debug dumps in {} or refresh the cookies.", options.debug_dir.display());
            }
            if let Some(tui) = tui.as_deref_mut() {
                tui.finish_page(page, 0, records.len()).ok();
            }
            break RunOutcome::Completed(StopReason::EmptyPage);
        }

        let count = result.records.len();
        records.extend(result.records);
        if let Some(tui) = tui.as_deref_mut() {
            tui.finish_page(page, count, records.len()).ok();
        }

        if !result.has_more {
            break RunOutcome::Completed(StopReason::NoMorePages);
        }
        context = result.context;
        page += 1;

        if page <= options.max_pages && pause(transport.page_delay(), &options.cancel).await.is_err() {
            break RunOutcome::Aborted(FetchError::Cancelled);
        }
    };

    if let Err(e) = transport.shutdown().await {
        eprintln!("Failed to shut down {}: {}", transport.name(), e);
    }

    ScrapingResult {
        records,
        pages_fetched,
        outcome,
    }
}

/// Runs the pagination and writes whatever it collected to the output CSV.
pub async fn scrape_to_csv<T: FetchTransport + ?Sized>(
    transport: &mut T,
    config: &MarketConfig,
    options: &ScrapingOptions,
    tui: Option<&mut ScraperTUI>,
) -> Result<ScrapingResult> {
    let result = run_scraper_with_options(transport, config, options, tui).await;

    if let RunOutcome::Aborted(e) = &result.outcome {
        eprintln!("Run stopped early: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("  Hint: {}", hint);
        }
    }

    if result.records.is_empty() {
        println!("\nCould not extract any listings.");
    } else {
        utils::save_records_to_csv(&result.records, &options.output_file)?;
        println!("\nDone. Total listings: {}", result.records.len());
    }

    Ok(result)
}

/// Extracts and normalizes one page and derives the continuation signals.
pub fn read_page(body: &Value, page: usize, config: &MarketConfig, options: &ScrapingOptions) -> PageResult {
    let listings = match extractor::match_shape(body) {
        Some((shape, listings)) => {
            debug_println!("Page {}: matched {:?} with {} raw listings", page, shape, listings.len());
            listings
        }
        None => Vec::new(),
    };

    if listings.is_empty() && debug::should_dump(page) {
        report_unrecognized(body, options);
    }

    let records: Vec<NormalizedRecord> = listings
        .iter()
        .filter_map(|listing| parser::normalize_listing(listing, config))
        .collect();

    PageResult {
        has_more: page_has_more(body, page, records.len()),
        context: continuation_context(body),
        records,
    }
}

fn report_unrecognized(body: &Value, options: &ScrapingOptions) {
    let Some(object) = body.as_object() else {
        return;
    };
    match debug::dump_json(&options.debug_dir, body) {
        Ok(path) => println!("  Saved the full response to {}", path.display()),
        Err(e) => eprintln!("  Failed to save the response: {}", e),
    }
    println!("  Response keys: {:?}", object.keys().collect::<Vec<_>>());
    if let Some(nested) = extractor::nested_result(object) {
        println!("  result keys: {:?}", nested.keys().collect::<Vec<_>>());
    }
}

/// `page * per_page < total` when the body has the counters, otherwise a
/// full page is taken as a sign that more follow.
pub fn page_has_more(body: &Value, page: usize, record_count: usize) -> bool {
    match authoritative_has_more(body, page) {
        Some(has_more) => has_more,
        None => record_count >= FULL_PAGE_HINT,
    }
}

fn authoritative_has_more(body: &Value, page: usize) -> Option<bool> {
    let object = body.as_object()?;
    let total = first_truthy(object, &TOTAL_KEYS)?;
    let total = as_integer(total)?;
    let per_page = match first_truthy(object, &PER_PAGE_KEYS) {
        Some(value) => as_integer(value)?,
        None => FULL_PAGE_HINT as i64,
    };
    Some((page as i64).saturating_mul(per_page) < total)
}

fn first_truthy<'a>(object: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| is_truthy(value))
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Opaque `context` token some responses carry for the next page.
pub fn continuation_context(body: &Value) -> Option<String> {
    body.get("context")
        .and_then(Value::as_str)
        .filter(|context| !context.is_empty())
        .map(str::to_string)
}

/// Sleeps for `duration` unless `cancel` fires first.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), FetchError> {
    if duration.is_zero() {
        return if cancel.is_cancelled() { Err(FetchError::Cancelled) } else { Ok(()) };
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
