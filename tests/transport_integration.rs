//! Pipeline over the real hyper transport against a local backend.

use axum::http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use todo_api_pipeline::config::{ConfigHandle, Environment, PipelineConfig, TransportConfig};
use todo_api_pipeline::{ApiRequest, Pipeline, TransportError};

mod common;

/// Live calls with the smallest retry budget (one retry, 100ms).
fn live_config(base_url: String, request_timeout_ms: u64) -> ConfigHandle {
    ConfigHandle::new(PipelineConfig {
        environment: Environment::Mock,
        mock_override: Some(false),
        transport: TransportConfig {
            base_url,
            request_timeout_ms,
            ..TransportConfig::default()
        },
        ..PipelineConfig::default()
    })
}

#[tokio::test]
async fn test_retry_on_backend_failure() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let addr = common::start_programmable_backend(move |n| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n == 0 {
                (503, r#"{"success":false}"#.to_string())
            } else {
                (200, r#"{"success":true,"data":{"tasks":[]}}"#.to_string())
            }
        }
    })
    .await;

    let pipeline =
        Pipeline::with_hyper_transport(live_config(format!("http://{addr}/api/v1"), 5_000))
            .unwrap();
    let response = pipeline
        .execute_with_retry(ApiRequest::get("/tasks").unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    let body: serde_json::Value = response.json_body().unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_connection_refused_is_retried_then_surfaced() {
    let addr = common::unused_addr().await;
    let pipeline =
        Pipeline::with_hyper_transport(live_config(format!("http://{addr}/api/v1"), 5_000))
            .unwrap();

    let err = pipeline
        .execute_with_retry(ApiRequest::get("/tasks").unwrap())
        .await
        .unwrap_err();

    assert!(
        matches!(err, TransportError::ConnectionRefused(_)),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let addr = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "{}".to_string())
    })
    .await;

    let pipeline =
        Pipeline::with_hyper_transport(live_config(format!("http://{addr}/api/v1"), 200)).unwrap();
    let err = pipeline
        .execute_with_retry(ApiRequest::get("/tasks").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_post_with_json_body() {
    let addr = common::start_programmable_backend(|_| async {
        (200, r#"{"success":true}"#.to_string())
    })
    .await;

    let pipeline =
        Pipeline::with_hyper_transport(live_config(format!("http://{addr}/api/v1"), 5_000))
            .unwrap();
    let request = ApiRequest::post("/feedback")
        .unwrap()
        .with_json(&serde_json::json!({ "message": "great app" }))
        .unwrap();
    let response = pipeline.execute_with_retry(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
