//! Tests for spreadsheet sources

use super::*;
use crate::auth::{AuthConfig, Location};
use crate::error::FailureKind;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn google(server: &MockServer) -> GoogleSheetsSource {
    let auth = AuthConfig::ApiKey {
        location: Location::Query,
        header_name: None,
        query_param: None,
        value: "test-key".to_string(),
    };
    GoogleSheetsSource::new(&server.uri(), "sheet-123", auth, Some(100)).unwrap()
}

// ============================================================================
// GoogleSheetsSource Tests
// ============================================================================

#[test]
fn test_google_requires_spreadsheet_id() {
    let err = GoogleSheetsSource::new(DEFAULT_SHEETS_URL, " ", AuthConfig::None, None).unwrap_err();
    assert_eq!(err.failure_kind(), FailureKind::Credentials);
}

#[tokio::test]
async fn test_google_list_ranges_merges_named_ranges_and_tabs() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "namedRanges": [{"name": "NetWorth"}, {"name": "Budget"}],
            "sheets": [
                {"properties": {"title": "Budget"}},
                {"properties": {"title": "Transactions"}}
            ]
        })))
        .mount(&server)
        .await;

    let ranges = google(&server).list_ranges().await.unwrap();
    assert_eq!(ranges, vec!["NetWorth", "Budget", "Transactions"]);
}

#[tokio::test]
async fn test_google_batch_get_maps_by_request_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values:batchGet"))
        .and(query_param("ranges", "Budget"))
        .and(query_param("ranges", "Recurring"))
        .and(query_param("valueRenderOption", "UNFORMATTED_VALUE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-123",
            "valueRanges": [
                {"range": "Budget!A1:C3", "values": [["Category", "Budgeted"], ["Food", 500]]},
                {"range": "Recurring!A1:D1"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let grids = google(&server)
        .batch_get(&["Budget".to_string(), "Recurring".to_string()])
        .await
        .unwrap();

    assert_eq!(grids["Budget"], vec![vec![json!("Category"), json!("Budgeted")], vec![json!("Food"), json!(500)]]);
    assert!(grids["Recurring"].is_empty());
}

#[tokio::test]
async fn test_google_batch_get_rejects_short_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values:batchGet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valueRanges": []})))
        .mount(&server)
        .await;

    let result = google(&server).batch_get(&["Budget".to_string()]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_google_get_escapes_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Net%20Worth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "'Net Worth'!A1:B2",
            "values": [["Date", "Amount"], ["2024-01-01", 10]]
        })))
        .mount(&server)
        .await;

    let grid = google(&server).get("Net Worth").await.unwrap();
    assert_eq!(grid.len(), 2);
}

#[tokio::test]
async fn test_google_get_error_names_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Budget"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Unable to parse range"))
        .mount(&server)
        .await;

    let err = google(&server).get("Budget").await.unwrap_err();
    assert!(err.to_string().contains("Budget"));
}

#[tokio::test]
async fn test_google_forbidden_is_permission() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123"))
        .respond_with(ResponseTemplate::new(403).set_body_string("The caller does not have permission"))
        .mount(&server)
        .await;

    let err = google(&server).list_ranges().await.unwrap_err();
    assert_eq!(err.failure_kind(), FailureKind::Permission);
}

// ============================================================================
// FixtureSource Tests
// ============================================================================

#[tokio::test]
async fn test_fixture_source_serves_grids() {
    let source = FixtureSource::new().with_range("Budget", vec![vec![json!("Category")]]);

    assert_eq!(source.list_ranges().await.unwrap(), vec!["Budget"]);
    let grids = source.batch_get(&["Budget".to_string()]).await.unwrap();
    assert_eq!(grids["Budget"].len(), 1);
    assert_eq!(source.batch_calls(), 1);
    assert!(source.get("Missing").await.is_err());
}

#[tokio::test]
async fn test_fixture_source_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("sheet.json");
    std::fs::write(&file, r#"{"NetWorth": [["Date", "Category", "Amount"], ["2024-01-31", "Cash", 100]]}"#)
        .unwrap();

    let source = FixtureSource::from_json_file(&file).unwrap();
    let grid = source.get("NetWorth").await.unwrap();
    assert_eq!(grid[1][2], json!(100));
}
