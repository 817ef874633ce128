use anyhow::{Context, Result};
use scraper::{Html, Selector};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub const HTML_DUMP_FILE: &str = "avito_debug_response.html";
pub const JSON_DUMP_FILE: &str = "avito_debug.json";
const HTML_DUMP_LIMIT: usize = 50_000;

pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            println!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! debug_eprintln {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!($($arg)*);
        }
    };
}

/// Dumps are written for the first page, and for every page in debug mode.
pub fn should_dump(page: usize) -> bool {
    page == 1 || is_debug_enabled()
}

/// Saves the start of a non-JSON response for inspection.
pub fn dump_html(dir: &Path, body: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).context(format!("Failed to create debug directory: {}", dir.display()))?;
    let path = dir.join(HTML_DUMP_FILE);
    let end = body.len().min(HTML_DUMP_LIMIT);
    fs::write(&path, &body[..end]).context(format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn dump_json(dir: &Path, body: &Value) -> Result<PathBuf> {
    fs::create_dir_all(dir).context(format!("Failed to create debug directory: {}", dir.display()))?;
    let path = dir.join(JSON_DUMP_FILE);
    let pretty = serde_json::to_string_pretty(body)?;
    fs::write(&path, pretty).context(format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// `<title>` of an HTML page; block pages usually say what happened there.
pub fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();
    (!title.is_empty()).then_some(title)
}
