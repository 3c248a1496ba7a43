//! Store configuration endpoints and their cache.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;
use whitelabel_integration_tests::TestApp;

#[tokio::test]
async fn test_first_read_creates_defaults() {
    let app = TestApp::new();

    let (status, config) = app.get("/api/settings").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["storeName"], "My Shop");
    assert_eq!(config["storeDescription"], "Welcome to our online store");
    assert_eq!(config["primaryColor"], "#6366f1");
    assert_eq!(config["currency"], "USD");
}

#[tokio::test]
async fn test_repeated_reads_hit_the_cache() {
    let app = TestApp::new();

    for _ in 0..5 {
        let (status, _) = app.get("/api/settings").await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.store.config_loads(), 1);
}

#[tokio::test]
async fn test_update_is_visible_immediately() {
    let app = TestApp::new();
    app.get("/api/settings").await;

    let (status, updated) = app
        .post(
            "/admin/api/settings",
            json!({ "storeName": "Acme", "primaryColor": "#007ACC", "logoUrl": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["primaryColor"], "#007acc");

    let (_, config) = app.get("/api/settings").await;
    assert_eq!(config["storeName"], "Acme");
    assert_eq!(config["storeDescription"], "Welcome to our online store");
    assert!(config["logoUrl"].is_null());
}

#[tokio::test]
async fn test_invalid_update_changes_nothing() {
    let app = TestApp::new();

    let (status, error) = app
        .post(
            "/admin/api/settings",
            json!({ "storeName": "  ", "primaryColor": "blue", "currency": "DOGE" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["fields"]["storeName"].is_array());
    assert!(error["fields"]["primaryColor"].is_array());
    assert!(error["fields"]["currency"].is_array());

    let (_, config) = app.get("/api/settings").await;
    assert_eq!(config["storeName"], "My Shop");
}
