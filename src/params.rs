use crate::config::MarketConfig;
use crate::models::PageRequest;
use serde::Serialize;

const DATE_FORMAT: &str = "%Y%m%d";

// Without these the endpoint answers with the HTML page instead of JSON.
const FEATURE_FLAGS: [(&str, &str); 6] = [
    ("features[imageAspectRatio]", "1:1"),
    ("features[noPlaceholders]", "true"),
    ("features[justSpa]", "true"),
    ("features[responsive]", "true"),
    ("features[useReload]", "true"),
    ("features[simpleCounters]", "true"),
];

/// Full ordered query for one page of the daily-rental search.
pub fn build_params(config: &MarketConfig, request: &PageRequest) -> Vec<(String, String)> {
    let from = request.window.date_from.format(DATE_FORMAT).to_string();
    let to = request.window.date_to.format(DATE_FORMAT).to_string();

    let mut params: Vec<(String, String)> = vec![
        ("categoryId".into(), config.category_id.to_string()),
        ("locationId".into(), config.location_id.to_string()),
        ("cd".into(), "0".into()),
        ("p".into(), request.page.to_string()),
        // rent out
        ("params[201]".into(), "1060".into()),
        // per day
        ("params[504]".into(), "5257".into()),
        ("params[2900][from]".into(), from),
        ("params[2900][to]".into(), to),
        ("params[123093]".into(), "3022414".into()),
        ("params[170408]".into(), guests_param()),
        ("params[178133]".into(), "1".into()),
        ("params[183058]".into(), "3331813".into()),
        ("verticalCategoryId".into(), "1".into()),
        ("rootCategoryId".into(), "4".into()),
        ("localPriority".into(), "0".into()),
        ("spaFlow".into(), "true".into()),
        ("updateListOnly".into(), "true".into()),
    ];
    params.extend(
        FEATURE_FLAGS
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string())),
    );

    if let Some(context) = request.context.as_deref().filter(|c| !c.is_empty()) {
        params.push(("context".into(), context.to_string()));
    }

    params
}

/// Two adults, no children, as compact JSON.
fn guests_param() -> String {
    let guests = Guests {
        version: 1,
        total_count: 2,
        adults_count: 2,
        children: Vec::new(),
    };
    serde_json::to_string(&guests).unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Guests {
    version: u8,
    total_count: u8,
    adults_count: u8,
    children: Vec<u8>,
}

pub fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Items API URL with the encoded query for `request`.
pub fn page_url(config: &MarketConfig, request: &PageRequest) -> String {
    format!("{}?{}", config.items_api, encode_query(&build_params(config, request)))
}
