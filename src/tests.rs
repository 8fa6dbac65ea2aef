use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::clickhouse::QueryExecutor;
use crate::cost::QueryCostEnvelope;
use crate::dashboard::DashboardOptions;
use crate::error::QueryError;
use crate::routes::{router, AppState};
use crate::testing::{dashboard_executor, ScriptedExecutor};

fn app(executor: Arc<ScriptedExecutor>) -> axum::Router {
    let executor: Arc<dyn QueryExecutor> = executor;
    router(Arc::new(AppState {
        executor,
        options: DashboardOptions::default(),
    }))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = get(app(Arc::new(ScriptedExecutor::new())), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_dashboard_renders_every_widget() {
    let (status, body) = get(app(Arc::new(dashboard_executor())), "/api/dashboard").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overview"]["data"]["artists"], 1000);
    assert_eq!(body["top_areas"]["data"][0]["category"], "United States");
    assert_eq!(body["pareto"]["data"]["outcome"]["status"], "reached");
    assert_eq!(body["pareto"]["data"]["outcome"]["rank_at_threshold"], 2);
    assert_eq!(body["rollup_comparison"]["agreement"]["totals_agree"], true);
    assert_eq!(body["recently_updated"]["data"][0]["last_updated"], "2024-05-01 10:00:00");
    assert!(body["snapshot_id"].is_string());
    assert!(body["total_cost"]["elapsed_seconds"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_dashboard_failure_is_an_error_state() {
    let executor = dashboard_executor().with_error(
        "top_initials",
        QueryError::Status {
            status: 500,
            message: "Code: 241. DB::Exception: Memory limit exceeded".to_string(),
        },
    );

    let (status, body) = get(app(Arc::new(executor)), "/api/dashboard").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "status");
    assert!(body["error"].as_str().unwrap().contains("Memory limit exceeded"));
    assert!(body.get("overview").is_none());
}

#[tokio::test]
async fn test_timeout_maps_to_bad_gateway() {
    let executor = dashboard_executor().with_error("overview", QueryError::Timeout(Duration::from_secs(60)));

    let (status, body) = get(app(Arc::new(executor)), "/api/overview").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "timeout");
}

#[tokio::test]
async fn test_limit_is_passed_to_the_query() {
    let executor = Arc::new(dashboard_executor());

    let (status, _) = get(app(executor.clone()), "/api/areas/top?limit=5").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(app(executor.clone()), "/api/initials?limit=500").await;
    assert_eq!(status, StatusCode::OK);

    let calls = executor.calls();
    assert!(calls[0].ends_with("LIMIT 5"));
    assert!(calls[1].ends_with("LIMIT 100"));
}

#[tokio::test]
async fn test_pareto_threshold_parameter() {
    let executor = Arc::new(dashboard_executor());

    let (status, body) = get(app(executor.clone()), "/api/pareto?threshold=50&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"]["rank_at_threshold"], 1);
    assert_eq!(body["data"]["points"].as_array().unwrap().len(), 1);
    assert_eq!(body["cost"]["rows_read"], 3);

    let (status, body) = get(app(executor), "/api/pareto?threshold=150").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_threshold");
}

#[tokio::test]
async fn test_pareto_unreachable_renders_na() {
    let executor = ScriptedExecutor::new().with_rows(
        "area_distribution",
        json!([{ "area": "Nowhere", "artists": "0" }]),
        QueryCostEnvelope::default(),
    );

    let (status, body) = get(app(Arc::new(executor)), "/api/pareto").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"]["status"], "unreachable");
    assert_eq!(body["data"]["label"], "n/a");
    assert_eq!(body["data"]["points"][0]["cumulative_pct"], 0.0);
}

#[tokio::test]
async fn test_rollup_comparison_endpoint() {
    let (status, body) = get(app(Arc::new(dashboard_executor())), "/api/rollup-comparison").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["primary"]["label"], "raw");
    assert_eq!(body["secondary"]["label"], "rollup");
    assert_eq!(body["primary"]["cost"]["rows_read"], 1000);
    assert_eq!(body["secondary"]["cost"]["rows_read"], 3);
    assert_eq!(body["agreement"]["top_k_agree"], true);
}

#[tokio::test]
async fn test_most_edited_and_recent_endpoints() {
    let executor = Arc::new(dashboard_executor());

    let (status, body) = get(app(executor.clone()), "/api/artists/most-edited").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["edits"], 4100);

    let (status, body) = get(app(executor.clone()), "/api/artists/recent").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "Björk");

    let calls = executor.calls();
    assert!(calls[0].ends_with("LIMIT 12"));
    assert!(calls[1].ends_with("LIMIT 10"));
}
