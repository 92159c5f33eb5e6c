//! Dashboard API Tests
//!
//! Drives the router in-process with `oneshot`.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use assembly_dashboard::analytics::{AnalyticsAggregator, HttpResourceFetcher, RefreshPolicy};
use assembly_dashboard::error::{GatewayResult, PredictionError};
use assembly_dashboard::events::EventBus;
use assembly_dashboard::parameters::ParameterSpaceRegistry;
use assembly_dashboard::scenario::{PredictionGateway, PredictionResult, ScenarioSession};
use assembly_dashboard::server::{router, AppState};
use assembly_dashboard::ScenarioRequest;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::example_inputs;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Succeeds for what-if requests, reports the service down for optimizer ones
struct WhatIfOnlyGateway;

#[async_trait]
impl PredictionGateway for WhatIfOnlyGateway {
    async fn submit(&self, request: &ScenarioRequest) -> GatewayResult<PredictionResult> {
        if request.optimize_target().is_some() {
            return Err(PredictionError::ServiceUnavailable("connection refused".to_string()));
        }
        let defects: BTreeMap<String, f64> = [("No_Defect".to_string(), 1.0)].into_iter().collect();
        Ok(PredictionResult::new(defects, 88.5, None))
    }
}

async fn app() -> (Router, Arc<AnalyticsAggregator>) {
    let events = EventBus::default();
    // Nothing listens on port 9; analytics fetches fail fast
    let fetcher = Arc::new(HttpResourceFetcher::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap());
    let aggregator = Arc::new(AnalyticsAggregator::new(
        fetcher,
        RefreshPolicy::new(Duration::from_secs(5)),
        events.clone(),
    ));
    let session = Arc::new(ScenarioSession::new(Arc::new(WhatIfOnlyGateway), events.clone()));
    let state = AppState {
        registry: Arc::new(ParameterSpaceRegistry::assembly_line()),
        aggregator: aggregator.clone(),
        session,
        events,
    };
    (router(state), aggregator)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app().await;
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_parameters_lists_catalog_in_order() {
    let (app, _) = app().await;
    let response = app.oneshot(get("/api/parameters")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let params = body["parameters"].as_array().unwrap();
    assert_eq!(params.len(), 9);
    assert_eq!(params[0]["key"], "cellVoltage");
    assert_eq!(params[0]["label"], "Cell Voltage");
    assert_eq!(params[0]["unit"], "V");
    assert_eq!(params[8]["key"], "leakageRate");
}

#[tokio::test]
async fn test_what_if_submission() {
    let (app, _) = app().await;
    let response = app
        .clone()
        .oneshot(post_json("/api/scenario", json!({ "values": example_inputs() })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["efficiency_score"], 88.5);

    let view = json_body(app.oneshot(get("/api/scenario")).await.unwrap()).await;
    assert_eq!(view["generation"], 1);
    assert_eq!(view["pending"], false);
    assert_eq!(view["latest"]["efficiency_score"], 88.5);
}

#[tokio::test]
async fn test_missing_value_is_bad_request() {
    let (app, _) = app().await;
    let mut values = example_inputs();
    values.remove("torque");

    let response = app
        .oneshot(post_json("/api/scenario", json!({ "values": values })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].as_str().unwrap().contains("torque"));
}

#[tokio::test]
async fn test_unknown_optimize_target_is_bad_request() {
    let (app, _) = app().await;
    let response = app
        .oneshot(post_json(
            "/api/scenario",
            json!({ "values": example_inputs(), "optimize": "humidity" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gateway_failure_is_bad_gateway() {
    let (app, _) = app().await;
    let response = app
        .oneshot(post_json(
            "/api/scenario",
            json!({ "values": example_inputs(), "optimize": "weldingCurrent" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_analytics_reports_per_resource_state() {
    let (app, aggregator) = app().await;

    let body = json_body(app.clone().oneshot(get("/api/analytics")).await.unwrap()).await;
    assert_eq!(body["performance"]["status"], "pending");

    aggregator.refresh_now().await;
    let body = json_body(app.oneshot(get("/api/analytics")).await.unwrap()).await;
    for key in [
        "performance",
        "feature_importance",
        "confusion_matrix",
        "efficiency_scatter",
        "anomalies",
        "errors",
    ] {
        assert_eq!(body[key]["status"], "failed", "{}", key);
        assert!(body[key]["payload"].is_null());
        assert!(body[key]["last_error"].is_string());
        assert_eq!(body[key]["cycle"], 1);
    }
}

#[tokio::test]
async fn test_text_form_fields_are_parsed() {
    let (app, _) = app().await;
    let values: serde_json::Map<String, Value> = example_inputs()
        .into_iter()
        .map(|(k, v)| (k, Value::String(format!(" {} ", v))))
        .collect();

    let response = app
        .oneshot(post_json("/api/scenario", json!({ "values": values })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_and_blank_text_fields_are_bad_request() {
    let (app, _) = app().await;

    let mut values: serde_json::Map<String, Value> =
        example_inputs().into_iter().map(|(k, v)| (k, json!(v))).collect();
    values.insert("torque".to_string(), json!("ten"));
    let response = app
        .clone()
        .oneshot(post_json("/api/scenario", json!({ "values": values })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].as_str().unwrap().contains("torque"));

    values.insert("torque".to_string(), json!("   "));
    let response = app
        .oneshot(post_json("/api/scenario", json!({ "values": values })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].as_str().unwrap().contains("missing"));
}
