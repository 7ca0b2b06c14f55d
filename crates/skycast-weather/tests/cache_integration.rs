//! End-to-end tests for WeatherCache against a mock weatherapi.com server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use skycast_weather::{
    cache_key, CacheEntry, KeyValueStore, SqliteStore, StaticReachability, WeatherCache,
    WeatherDocument, WeatherProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAT: f64 = 1.3521;
const LON: f64 = 103.8198;

fn singapore(temp: i64) -> serde_json::Value {
    json!({
        "current": { "temp_c": temp },
        "location": { "name": "Singapore" }
    })
}

fn build_cache(base_url: &str, store: Arc<SqliteStore>, connected: bool) -> WeatherCache {
    let provider =
        WeatherProvider::with_options("test-key", base_url, Duration::from_secs(5)).unwrap();
    WeatherCache::new(
        store,
        Arc::new(StaticReachability::new(connected)),
        Arc::new(provider),
    )
}

async fn seed(store: &SqliteStore, data: serde_json::Value, age_ms: i64) {
    let entry = CacheEntry::new(
        WeatherDocument::new(data),
        chrono::Utc::now().timestamp_millis() - age_ms,
    );
    store
        .set(&cache_key(LAT, LON), &serde_json::to_string(&entry).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fetches_and_persists_to_disk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("q", "1.3521,103.8198"))
        .respond_with(ResponseTemplate::new(200).set_body_json(singapore(25)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("weather.db");
    let store = Arc::new(SqliteStore::open(&db).unwrap());
    let cache = build_cache(&server.uri(), store, true);

    let result = cache.get_weather(LAT, LON).await.unwrap();
    assert_eq!(result.as_value(), &singapore(25));

    // A new process sees the entry and serves it without another request
    let reopened = Arc::new(SqliteStore::open(&db).unwrap());
    let raw = reopened.get(&cache_key(LAT, LON)).await.unwrap().unwrap();
    let entry: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(entry["data"], singapore(25));
    assert!(entry["timestamp"].is_i64());

    let cache = build_cache(&server.uri(), reopened, true);
    assert_eq!(cache.get_weather(LAT, LON).await.unwrap().as_value(), &singapore(25));
}

#[tokio::test]
async fn test_fresh_cache_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(singapore(30)))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    seed(&store, singapore(25), 1_000).await;
    let cache = build_cache(&server.uri(), store, true);

    assert_eq!(cache.get_weather(LAT, LON).await.unwrap().as_value(), &singapore(25));
}

#[tokio::test]
async fn test_offline_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(singapore(30)))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    seed(&store, singapore(25), 3 * 60 * 60 * 1_000).await;
    let cache = build_cache(&server.uri(), store, false);

    assert_eq!(cache.get_weather(LAT, LON).await.unwrap().as_value(), &singapore(25));
}

#[tokio::test]
async fn test_expired_cache_replaced_by_fresh_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(singapore(30)))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    seed(&store, singapore(25), 60 * 60 * 1_000 + 1).await;
    let cache = build_cache(&server.uri(), store.clone(), true);

    assert_eq!(cache.get_weather(LAT, LON).await.unwrap().as_value(), &singapore(30));

    let raw = store.get(&cache_key(LAT, LON)).await.unwrap().unwrap();
    let entry: CacheEntry = serde_json::from_str(&raw).unwrap();
    assert_eq!(entry.data.as_value(), &singapore(30));
}

fn failing_responses() -> Vec<(&'static str, ResponseTemplate)> {
    vec![
        ("http 500", ResponseTemplate::new(500)),
        ("http 429", ResponseTemplate::new(429)),
        ("corrupted body", ResponseTemplate::new(200).set_body_string("{oops")),
        ("null body", ResponseTemplate::new(200).set_body_json(serde_json::Value::Null)),
        ("empty body", ResponseTemplate::new(200).set_body_json(json!({}))),
        (
            "missing current",
            ResponseTemplate::new(200).set_body_json(json!({ "location": { "name": "X" } })),
        ),
        (
            "missing location",
            ResponseTemplate::new(200).set_body_json(json!({ "current": { "temp_c": 1 } })),
        ),
    ]
}

#[tokio::test]
async fn test_failures_without_cache_return_none() {
    for (label, response) in failing_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(response)
            .mount(&server)
            .await;

        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let cache = build_cache(&server.uri(), store.clone(), true);

        assert!(cache.get_weather(LAT, LON).await.is_none(), "{}", label);
        assert!(
            store.get(&cache_key(LAT, LON)).await.unwrap().is_none(),
            "{} must not be cached",
            label
        );
    }
}

#[tokio::test]
async fn test_failures_with_cache_return_cached_data() {
    for (label, response) in failing_responses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(response)
            .mount(&server)
            .await;

        let store = Arc::new(SqliteStore::in_memory().unwrap());
        seed(&store, singapore(25), 20 * 60 * 1_000).await;
        let cache = build_cache(&server.uri(), store, true);

        let result = cache.get_weather(LAT, LON).await;
        assert_eq!(
            result.map(WeatherDocument::into_value),
            Some(singapore(25)),
            "{}",
            label
        );
    }
}

#[tokio::test]
async fn test_transport_error_returns_none() {
    // Grab a free port, then release it so the connection is refused
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let cache = build_cache(&format!("http://127.0.0.1:{}", port), store, true);

    assert!(cache.get_weather(LAT, LON).await.is_none());
}

#[tokio::test]
async fn test_transport_error_falls_back_to_cache() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    seed(&store, singapore(25), 2 * 60 * 60 * 1_000).await;
    let cache = build_cache(&format!("http://127.0.0.1:{}", port), store, true);

    assert_eq!(cache.get_weather(LAT, LON).await.unwrap().as_value(), &singapore(25));
}
