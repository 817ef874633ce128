//! Direct transport against a mock items endpoint.

use avitofinder::common_scraper::FetchTransport;
use avitofinder::config::{MarketConfig, Timings};
use avitofinder::error::FetchError;
use avitofinder::models::{PageRequest, SearchWindow};
use avitofinder::scrapers::DirectScraper;
use chrono::NaiveDate;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const ITEMS_PATH: &str = "/web/1/js/items";

fn request(page: usize) -> PageRequest {
    PageRequest {
        page,
        window: SearchWindow::starting(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()),
        context: None,
    }
}

fn scraper(server: &MockServer, debug_dir: &TempDir, cookies: Option<&BTreeMap<String, String>>) -> DirectScraper {
    DirectScraper::new(
        MarketConfig::with_host(&server.uri()),
        Timings::immediate(),
        cookies,
        debug_dir.path().to_path_buf(),
        CancellationToken::new(),
    )
    .expect("failed to build scraper")
}

fn catalog_body() -> serde_json::Value {
    json!({"catalog": {"items": [{"id": 1, "title": "Flat"}]}, "totalCount": 1})
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

#[tokio::test]
async fn sends_search_params_and_browser_markers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .and(query_param("p", "2"))
        .and(query_param("categoryId", "24"))
        .and(query_param("params[2900][from]", "20250801"))
        .and(query_param("params[2900][to]", "20250802"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("x-source", "client-browser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let page = scraper(&server, &dir, None).fetch_page(&request(2)).await.unwrap();

    assert_eq!(page.status, 200);
    assert_eq!(page.body["catalog"]["items"][0]["title"], "Flat");
}

#[tokio::test]
async fn retries_429_and_succeeds_on_fourth_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let page = scraper(&server, &dir, None).fetch_page(&request(1)).await.unwrap();

    assert_eq!(page.body["totalCount"], 1);
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn persistent_429_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = scraper(&server, &dir, None).fetch_page(&request(1)).await.unwrap_err();

    assert!(matches!(err, FetchError::RetriesExhausted { attempts: 4 }));
    assert!(err.hint().is_some());
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn other_http_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = scraper(&server, &dir, None).fetch_page(&request(1)).await.unwrap_err();

    assert!(matches!(err, FetchError::Http { status: 403 }));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn html_answer_is_an_empty_page_and_gets_dumped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<html><head><title>Доступ ограничен</title></head></html>"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let page = scraper(&server, &dir, None).fetch_page(&request(1)).await.unwrap();

    assert!(page.body.is_null());
    assert_eq!(request_count(&server).await, 1);
    assert!(dir.path().join(avitofinder::debug::HTML_DUMP_FILE).exists());
}

#[tokio::test]
async fn broken_json_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"catalog\": ", "application/json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = scraper(&server, &dir, None).fetch_page(&request(1)).await.unwrap_err();

    assert!(matches!(err, FetchError::Malformed(_)));
}

#[tokio::test]
async fn cookies_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .and(header("cookie", "sessid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .expect(1)
        .mount(&server)
        .await;

    let cookies = BTreeMap::from([("sessid".to_string(), "abc".to_string())]);
    let dir = TempDir::new().unwrap();
    let page = scraper(&server, &dir, Some(&cookies)).fetch_page(&request(1)).await.unwrap();

    assert_eq!(page.status, 200);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let dir = TempDir::new().unwrap();
    let mut scraper = DirectScraper::new(
        MarketConfig::with_host("http://127.0.0.1:1"),
        Timings::immediate(),
        None,
        dir.path().to_path_buf(),
        CancellationToken::new(),
    )
    .unwrap();

    let err = scraper.fetch_page(&request(1)).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn cancel_interrupts_the_429_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let timings = Timings {
        direct_backoff_step: Duration::from_secs(60),
        ..Timings::immediate()
    };
    let mut scraper = DirectScraper::new(
        MarketConfig::with_host(&server.uri()),
        timings,
        None,
        dir.path().to_path_buf(),
        cancel.clone(),
    )
    .unwrap();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = scraper.fetch_page(&request(1)).await.unwrap_err();

    assert!(matches!(err, FetchError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(request_count(&server).await, 1);
}
