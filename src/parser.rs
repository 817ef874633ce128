use crate::config::MarketConfig;
use crate::models::NormalizedRecord;
use reqwest::Url;
use serde_json::{Map, Value};

pub const DESCRIPTION_LIMIT: usize = 500;

type Listing = Map<String, Value>;
type Accessor = fn(&Listing) -> Option<String>;

// Candidate sources per output field, highest priority first.
const ID_SOURCES: &[Accessor] = &[id, item_id];
const TITLE_SOURCES: &[Accessor] = &[title, name];
const PRICE_SOURCES: &[Accessor] = &[price_detailed_value, price_detailed_full_string, price, price_value];
const URL_SOURCES: &[Accessor] = &[url_path, url, link];
const ADDRESS_SOURCES: &[Accessor] = &[address_location_name, location_name, address];

/// Flattens one raw listing. `None` when the listing is not a JSON object.
pub fn normalize_listing(raw: &Value, config: &MarketConfig) -> Option<NormalizedRecord> {
    let listing = raw.as_object()?;

    let id = first_present(listing, ID_SOURCES);
    let mut url = first_present(listing, URL_SOURCES);
    if !url.is_empty() && !url.starts_with("http") {
        url = join_url(&config.base_url, &url);
    }
    if url.is_empty() && !id.is_empty() {
        url = join_url(&config.base_url, &format!("{}/{}", config.listing_path, id));
    }

    Some(NormalizedRecord {
        title: first_present(listing, TITLE_SOURCES),
        price: first_present(listing, PRICE_SOURCES),
        address: first_present(listing, ADDRESS_SOURCES),
        description: description(listing),
        url,
        id,
    })
}

fn first_present(listing: &Listing, sources: &[Accessor]) -> String {
    sources
        .iter()
        .find_map(|accessor| accessor(listing).filter(|value| !value.is_empty()))
        .unwrap_or_default()
}

/// Resolves `path` against `base` the way a browser would, so `//host/x`
/// keeps its own host. Plain concatenation if `base` does not parse.
fn join_url(base: &str, path: &str) -> String {
    if let Ok(resolved) = Url::parse(base).and_then(|base| base.join(path)) {
        return resolved.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// String or number as text; anything else counts as absent.
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn trimmed(value: Option<&Value>) -> Option<String> {
    scalar(value).map(|s| s.trim().to_string())
}

fn nested<'a>(listing: &'a Listing, object: &str, field: &str) -> Option<&'a Value> {
    listing.get(object)?.as_object()?.get(field)
}

fn id(listing: &Listing) -> Option<String> {
    trimmed(listing.get("id"))
}

fn item_id(listing: &Listing) -> Option<String> {
    trimmed(listing.get("itemId"))
}

fn title(listing: &Listing) -> Option<String> {
    trimmed(listing.get("title"))
}

fn name(listing: &Listing) -> Option<String> {
    trimmed(listing.get("name"))
}

fn price_detailed_value(listing: &Listing) -> Option<String> {
    scalar(nested(listing, "priceDetailed", "value"))
}

fn price_detailed_full_string(listing: &Listing) -> Option<String> {
    trimmed(nested(listing, "priceDetailed", "fullString"))
}

fn price(listing: &Listing) -> Option<String> {
    scalar(listing.get("price"))
}

fn price_value(listing: &Listing) -> Option<String> {
    scalar(listing.get("priceValue"))
}

fn url_path(listing: &Listing) -> Option<String> {
    scalar(listing.get("urlPath"))
}

fn url(listing: &Listing) -> Option<String> {
    scalar(listing.get("url"))
}

fn link(listing: &Listing) -> Option<String> {
    scalar(listing.get("link"))
}

fn address_location_name(listing: &Listing) -> Option<String> {
    trimmed(nested(listing, "addressDetailed", "locationName"))
}

fn location_name(listing: &Listing) -> Option<String> {
    trimmed(nested(listing, "location", "name"))
}

fn address(listing: &Listing) -> Option<String> {
    trimmed(listing.get("address"))
}

/// Trimmed and cut to the first 500 characters, no ellipsis.
fn description(listing: &Listing) -> String {
    trimmed(listing.get("description"))
        .map(|text| text.chars().take(DESCRIPTION_LIMIT).collect())
        .unwrap_or_default()
}
