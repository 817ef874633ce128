use crate::common_scraper::{RunOutcome, ScrapingResult, StopReason};
use crate::config::MarketConfig;
use crate::error::FetchError;
use crate::models::SearchWindow;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use std::io;
use std::path::Path;

pub struct ScraperTUI {
    pages_done: usize,
    pages_failed: usize,
    listings: usize,
}

impl ScraperTUI {
    pub fn new() -> Self {
        Self {
            pages_done: 0,
            pages_failed: 0,
            listings: 0,
        }
    }

    /// Grey header with the fixed search and the date window.
    pub fn show_run_header(&mut self, mode: &str, config: &MarketConfig, window: &SearchWindow) -> io::Result<()> {
        execute!(
            io::stdout(),
            SetForegroundColor(Color::DarkGrey),
            Print(format!("🔧 Mode: {}\n", mode)),
            Print(format!("📍 Region: Irkutsk oblast (locationId={})\n", config.location_id)),
            Print(format!("🏠 Category: daily rental apartments (categoryId={})\n", config.category_id)),
            Print(format!(
                "📅 Dates: {} - {}\n",
                window.date_from.format("%d.%m.%Y"),
                window.date_to.format("%d.%m.%Y")
            )),
            ResetColor
        )
    }

    pub fn start_page(&mut self, page: usize, max_pages: usize) -> io::Result<()> {
        execute!(
            io::stdout(),
            SetForegroundColor(Color::White),
            Print(format!("⏳ Page {}/{}...\n", page, max_pages)),
            ResetColor
        )
    }

    pub fn finish_page(&mut self, page: usize, count: usize, total: usize) -> io::Result<()> {
        self.pages_done += 1;
        self.listings = total;
        let color = if count > 0 { Color::Green } else { Color::DarkGrey };
        execute!(
            io::stdout(),
            SetForegroundColor(color),
            Print(format!("  ✓ Page {}: {} listings, {} total\n", page, count, total)),
            ResetColor
        )
    }

    pub fn fail_page(&mut self, page: usize, error: &FetchError) -> io::Result<()> {
        self.pages_failed += 1;
        execute!(
            io::stdout(),
            SetForegroundColor(Color::Red),
            Print(format!("  ❌ Page {}: {}\n", page, error)),
            ResetColor
        )
    }

    pub fn show_final_summary(&mut self, result: &ScrapingResult, output: &Path) -> io::Result<()> {
        let (color, status) = match &result.outcome {
            RunOutcome::Completed(StopReason::NoMorePages) => (Color::Green, "✅ Completed: last page reached".to_string()),
            RunOutcome::Completed(StopReason::EmptyPage) => (Color::Green, "✅ Completed: no more listings".to_string()),
            RunOutcome::Completed(StopReason::PageLimit) => (Color::Green, "✅ Completed: page limit reached".to_string()),
            RunOutcome::Aborted(e) => (Color::Yellow, format!("⚠ Stopped early: {}", e)),
        };

        execute!(
            io::stdout(),
            Print("─".repeat(80)),
            Print("\n"),
            SetForegroundColor(color),
            Print(status),
            ResetColor
        )?;

        if self.pages_failed > 0 {
            execute!(
                io::stdout(),
                SetForegroundColor(Color::Red),
                Print(format!(" | {} failed page", self.pages_failed)),
                ResetColor
            )?;
        }

        let saved = if result.records.is_empty() {
            "nothing saved".to_string()
        } else {
            format!("saved to {}", output.display())
        };
        execute!(
            io::stdout(),
            SetForegroundColor(Color::DarkGrey),
            Print(format!(
                " | {} pages, {} listings, {}\n",
                self.pages_done, self.listings, saved
            )),
            ResetColor
        )
    }
}

impl Default for ScraperTUI {
    fn default() -> Self {
        Self::new()
    }
}
