//! Tests for the auth module

use super::authenticator::sign_assertion;
use super::*;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    let client = reqwest::Client::new();
    let req = client.get("https://example.com/api");

    let built = auth.apply(req).await.unwrap().build().unwrap();
    assert!(built.headers().get("Authorization").is_none());
}

#[tokio::test]
async fn test_api_key_query_default_param() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Query,
        header_name: None,
        query_param: None,
        value: "sheet-key".to_string(),
    });

    let client = reqwest::Client::new();
    let req = client.get("https://example.com/v4/spreadsheets/abc");
    let built = auth.apply(req).await.unwrap().build().unwrap();

    assert_eq!(built.url().query(), Some("key=sheet-key"));
}

#[tokio::test]
async fn test_api_key_header() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        location: Location::Header,
        header_name: Some("apikey".to_string()),
        query_param: None,
        value: "anon-key".to_string(),
    });

    let client = reqwest::Client::new();
    let req = client.get("https://example.com/rest/v1/t");
    let built = auth.apply(req).await.unwrap().build().unwrap();

    assert_eq!(built.headers().get("apikey").unwrap(), "anon-key");
}

#[tokio::test]
async fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "user-token".to_string(),
    });

    let client = reqwest::Client::new();
    let req = client.get("https://example.com/api");
    let built = auth.apply(req).await.unwrap().build().unwrap();

    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer user-token"
    );
}

#[tokio::test]
async fn test_oauth2_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2Refresh {
        token_url: format!("{}/token", mock_server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "rt-1".to_string(),
    });

    let client = reqwest::Client::new();

    // Second request must reuse the cached token
    for _ in 0..2 {
        let req = client.get("https://example.com/api");
        let built = auth.apply(req).await.unwrap().build().unwrap();
        assert_eq!(
            built.headers().get("Authorization").unwrap(),
            "Bearer fresh-token"
        );
    }
}

#[tokio::test]
async fn test_clear_cache_forces_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2Refresh {
        token_url: format!("{}/token", mock_server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "rt".to_string(),
    });

    let client = reqwest::Client::new();
    let first = auth
        .apply(client.get("https://example.com"))
        .await
        .unwrap()
        .build()
        .unwrap();
    auth.clear_cache().await;
    let second = auth
        .apply(client.get("https://example.com"))
        .await
        .unwrap()
        .build()
        .unwrap();

    for request in [first, second] {
        assert_eq!(
            request.headers().get("Authorization").unwrap(),
            "Bearer tok"
        );
    }
}

#[tokio::test]
async fn test_oauth2_refresh_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::Oauth2Refresh {
        token_url: format!("{}/token", mock_server.uri()),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "revoked".to_string(),
    });

    let client = reqwest::Client::new();
    let err = auth
        .apply(client.get("https://example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, crate::error::Error::TokenRefresh { .. }));
    assert_eq!(err.failure_kind(), crate::error::FailureKind::Credentials);
}

#[tokio::test]
async fn test_service_account_without_key() {
    let auth = Authenticator::new(AuthConfig::ServiceAccount {
        key: None,
        scopes: vec![],
        subject: None,
    });

    let client = reqwest::Client::new();
    let err = auth
        .apply(client.get("https://example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::Auth { .. }));
}

#[test]
fn test_sign_assertion_rejects_bad_pem() {
    let key = ServiceAccountKey {
        client_email: "sync@project.iam.gserviceaccount.com".to_string(),
        private_key: "not a pem".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
    };

    let err = sign_assertion(&key, &["scope".to_string()], None).unwrap_err();
    assert!(err.to_string().contains("Invalid private key"));
}
