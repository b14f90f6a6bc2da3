//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use crate::types::BackoffType;
use reqwest::Method;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base: &str) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(base)
        .no_rate_limit()
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(5),
        )
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://sheets.googleapis.com")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .header("apikey", "anon")
        .build();

    assert_eq!(
        config.base_url.as_deref(),
        Some("https://sheets.googleapis.com")
    );
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.default_headers.get("apikey"), Some(&"anon".to_string()));
    assert!(config.user_agent.starts_with("sheetsync/"));
}

#[test]
fn test_request_config_repeated_query_keys() {
    let config = RequestConfig::new()
        .query("ranges", "Budget")
        .query("ranges", "Recurring")
        .retries(1);

    assert_eq!(config.query.len(), 2);
    assert_eq!(config.max_retries, Some(1));
}

#[test]
fn test_calculate_backoff() {
    let config = HttpClientConfig::builder()
        .backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_millis(500),
        )
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(client.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(client.calculate_backoff(2), Duration::from_millis(400));
    assert_eq!(client.calculate_backoff(10), Duration::from_millis(500));
}

#[tokio::test]
async fn test_get_json_with_repeated_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/values"))
        .and(query_param("ranges", "Budget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let body: serde_json::Value = client
        .get_json("/values", RequestConfig::new().query("ranges", "Budget"))
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_retry_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let response = client
        .request(Method::GET, "/flaky", RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "fine");
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_string("no access"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .request(Method::GET, "/forbidden", RequestConfig::new())
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "no access");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_retries_exhausted_returns_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .request(Method::GET, "/down", RequestConfig::new().retries(2))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_default_headers_and_auth_applied() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/items"))
        .and(header("apikey", "anon"))
        .and(header("Authorization", "Bearer session"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .header("apikey", "anon")
        .build();
    let client = HttpClient::with_auth(
        config,
        AuthConfig::Bearer {
            token: "session".to_string(),
        },
    )
    .unwrap();

    assert!(client.has_authenticator());
    let response = client
        .request(
            Method::POST,
            "/rest/v1/items",
            RequestConfig::new().json(serde_json::json!([{"a": 1}])),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}
