use crate::models::{NormalizedRecord, CSV_HEADER};
use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes all records to `output_path`, replacing any previous file.
/// UTF-8 with a byte-order mark so spreadsheet tools pick the encoding.
pub fn save_records_to_csv(records: &[NormalizedRecord], output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .context(format!("Failed to create output directory: {}", parent.display()))?;
    }

    let mut file = File::create(output_path)
        .context(format!("Failed to create output file: {}", output_path.display()))?;
    file.write_all(UTF8_BOM)?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(file);

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }

    writer.flush()?;
    println!("Saved {} listings to {}", records.len(), output_path.display());

    Ok(())
}

/// Parses a browser cookie header (`a=1; b=2`) into name/value pairs.
pub fn parse_cookie_string(cookie_string: &str) -> BTreeMap<String, String> {
    cookie_string
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

pub fn load_cookies(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read cookies file: {}", path.display()))?;
    Ok(parse_cookie_string(content.trim()))
}
