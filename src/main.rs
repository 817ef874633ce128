use anyhow::Result;
use avitofinder::common_scraper::{scrape_to_csv, FetchTransport, ScrapingOptions};
use avitofinder::config::{MarketConfig, Timings};
use avitofinder::models::SearchWindow;
use avitofinder::scrapers::{BrowserScraper, ChromiumSession, DirectScraper};
use avitofinder::tui::ScraperTUI;
use avitofinder::{debug, utils};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Plain HTTP requests (fast, but often answered with 429)
    Direct,
    /// Requests issued from inside a Chromium tab
    Browser,
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "Avitofinder - daily apartment rentals in Irkutsk oblast")]
struct Args {
    /// Path to output CSV file
    #[clap(short, long, default_value = "output/avito_apartments.csv")]
    output: PathBuf,

    /// How listing pages are fetched
    #[clap(long, value_enum, default_value = "browser")]
    mode: Mode,

    /// Maximum number of pages to scrape
    #[clap(short, long, default_value = "100")]
    max_pages: usize,

    /// Check-in date (YYYY-MM-DD), defaults to today
    #[clap(long)]
    date_from: Option<NaiveDate>,

    /// Check-out date (YYYY-MM-DD), defaults to the day after check-in
    #[clap(long)]
    date_to: Option<NaiveDate>,

    /// Run the browser without a window (on by default in GitHub Actions)
    #[clap(long, env = "GITHUB_ACTIONS")]
    headless: bool,

    /// File with a cookie string copied from the browser, for direct mode
    #[clap(short, long)]
    cookies: Option<PathBuf>,

    /// Where debug dumps of unexpected responses are written
    #[clap(long, default_value = "output")]
    debug_dir: PathBuf,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    debug::set_debug(args.debug);

    println!("Avitofinder - daily apartment rentals");
    println!("=====================================");

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nInterrupted, stopping after the current request...");
            on_ctrl_c.cancel();
        }
    });

    let config = MarketConfig::default();
    let timings = Timings::default();
    let options = ScrapingOptions {
        output_file: args.output.clone(),
        max_pages: args.max_pages,
        window: SearchWindow::new(args.date_from, args.date_to),
        debug_dir: args.debug_dir.clone(),
        cancel: cancel.clone(),
    };

    let mut transport: Box<dyn FetchTransport> = match args.mode {
        Mode::Browser => match open_browser(&args, &config, &timings, &cancel).await {
            Ok(scraper) => Box::new(scraper),
            Err(e) => {
                eprintln!("Browser mode unavailable: {:#}", e);
                println!("Falling back to direct requests (may be answered with 429).");
                Box::new(open_direct(&args, &config, &timings, &cancel)?)
            }
        },
        Mode::Direct => Box::new(open_direct(&args, &config, &timings, &cancel)?),
    };

    let mut tui = ScraperTUI::new();
    tui.show_run_header(transport.name(), &config, &options.window)?;

    let result = scrape_to_csv(transport.as_mut(), &config, &options, Some(&mut tui)).await?;
    tui.show_final_summary(&result, &options.output_file)?;

    Ok(())
}

async fn open_browser(
    args: &Args,
    config: &MarketConfig,
    timings: &Timings,
    cancel: &CancellationToken,
) -> Result<BrowserScraper<ChromiumSession>> {
    let session = ChromiumSession::launch(args.headless, &config.user_agent).await?;
    BrowserScraper::open(session, config.clone(), timings.clone(), cancel.clone()).await
}

fn open_direct(
    args: &Args,
    config: &MarketConfig,
    timings: &Timings,
    cancel: &CancellationToken,
) -> Result<DirectScraper> {
    let cookies = match &args.cookies {
        Some(path) => Some(utils::load_cookies(path)?),
        None => None,
    };
    DirectScraper::new(
        config.clone(),
        timings.clone(),
        cookies.as_ref(),
        args.debug_dir.clone(),
        cancel.clone(),
    )
}
