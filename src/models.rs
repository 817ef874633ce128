use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

/// Inclusive date range the search is filtered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl SearchWindow {
    /// `date_from` defaults to today, `date_to` to the day after `date_from`.
    pub fn new(date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) -> Self {
        let date_from = date_from.unwrap_or_else(|| Local::now().date_naive());
        let date_to = date_to.unwrap_or(date_from + Duration::days(1));
        Self { date_from, date_to }
    }

    pub fn starting(date_from: NaiveDate) -> Self {
        Self::new(Some(date_from), None)
    }
}

impl Default for SearchWindow {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page to fetch. Built fresh for every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub window: SearchWindow,
    pub context: Option<String>,
}

/// Flat listing row, serialized in the fixed CSV column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub id: String,
    pub title: String,
    pub price: String,
    pub address: String,
    pub description: String,
    pub url: String,
}

pub const CSV_HEADER: [&str; 6] = ["id", "title", "price", "address", "description", "url"];

#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub records: Vec<NormalizedRecord>,
    /// Derived from the body's counters, or guessed from the page size.
    pub has_more: bool,
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_defaults_to_one_night() {
        let from = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let window = SearchWindow::starting(from);
        assert_eq!(window.date_to, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn window_without_dates_starts_today() {
        let window = SearchWindow::default();
        assert_eq!(window.date_from, Local::now().date_naive());
        assert_eq!(window.date_to - window.date_from, Duration::days(1));
    }
}
