//! Shared test helpers for integration tests.

#![allow(dead_code)]

pub mod mock_paymo;

use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use paymo_dashboard::config::DashboardConfig;
use paymo_dashboard::dashboard::{build_router, AppState};
use paymo_dashboard::paymo::{build_http_client, PaymoClient};
use paymo_dashboard::performance::PerformanceOptions;
use paymo_dashboard::time::RetryPolicy;
use std::time::Duration;

pub use mock_paymo::{MockPaymo, DEFAULT_API_KEY};

/// Performance options with a short backoff so rate-limit tests stay fast.
pub fn fast_options(max_retries: u32) -> PerformanceOptions {
    PerformanceOptions {
        max_concurrency: 4,
        retry: RetryPolicy {
            backoff: Duration::from_millis(10),
            max_retries,
        },
    }
}

/// A Paymo client pointed at the mock with the mock's accepted key.
pub fn client_for(mock: &MockPaymo) -> PaymoClient {
    let http = build_http_client(Duration::from_secs(5)).unwrap();
    PaymoClient::new(http, &mock.url(), DEFAULT_API_KEY)
}

/// Config pointed at the mock. `api_key` is the default key the server uses.
pub fn config_for(mock: &MockPaymo, api_key: Option<&str>) -> DashboardConfig {
    let mut config = DashboardConfig::for_upstream(&mock.url(), api_key).unwrap();
    config.performance = fast_options(1);
    config
}

/// Build the dashboard router for `config`.
pub fn build_test_app(config: DashboardConfig) -> axum::Router {
    build_router(AppState::new(config).unwrap())
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body into a string.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A GET request for `uri`, optionally with a `Cookie` header.
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// A JSON request with `method` and `body`.
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
