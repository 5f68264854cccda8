mod common;

use common::declining_table;
use reqwest::StatusCode;
use serde_json::{json, Value};
use trend_decline::server::router;
use trend_decline::DeclineConfig;

async fn spawn_api() -> String {
    let app = router(&DeclineConfig::default(), "web").unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

async fn post_analysis(base: &str, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/api/trend-analysis", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn valid_table_is_analyzed() {
    let base = spawn_api().await;
    let rows = serde_json::to_value(&declining_table().rows).unwrap();

    let (status, body) = post_analysis(&base, json!({ "request_id": "r-1", "data": rows })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["request_id"], "r-1");
    assert_eq!(body["trend_name"], "Sourdough Challenge");
    assert!(body["decline_probability"].as_f64().unwrap() > 70.0);
}

#[tokio::test]
async fn snapshot_without_known_metrics_reports_failed() {
    let base = spawn_api().await;

    let (status, body) =
        post_analysis(&base, json!({ "request_id": "r-2", "data": { "followers": 1200 } })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["request_id"], "r-2");
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_data_is_a_bad_request() {
    let base = spawn_api().await;

    for data in [json!(42), json!(["not a row"]), json!({ "data": "rows" })] {
        let (status, body) = post_analysis(&base, json!({ "data": data })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "data: {}", data);
        assert_eq!(body["status"], "error");
        assert!(body["request_id"].as_str().unwrap().starts_with("req-"));
    }

    let (status, body) = post_analysis(&base, json!({ "trend_name": "No data" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn health_reports_template_mode() {
    let base = spawn_api().await;
    let body: Value = reqwest::get(format!("{}/api/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "trend-decline");
}
