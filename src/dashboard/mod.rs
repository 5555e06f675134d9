//! # Dashboard: Web Server
//!
//! Runs an Axum HTTP server that proxies read endpoints of the Paymo API,
//! serves per-project budget performance, and hosts the dashboard frontend
//! (a static export directory when configured, built-in pages otherwise).
//!
//! Every API request builds its own [`PaymoClient`] from the session's API key
//! cookie or the configured default key; the connection pool is shared.

mod api_error;
pub(crate) mod middleware_auth;
mod routes_auth;
mod routes_health;
mod routes_paymo;
mod routes_performance;
mod routes_projects;
mod routes_status;

pub use api_error::ApiError;

use crate::config::DashboardConfig;
use crate::paymo::{build_http_client, PaymoClient};
use crate::prom_metrics;
use crate::time::DateWindow;
use anyhow::Result;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};

pub struct AppState {
    pub config: DashboardConfig,
    pub http: reqwest::Client,
    pub prom_metrics: Arc<prom_metrics::Metrics>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Result<Arc<Self>> {
        let http = build_http_client(config.paymo.request_timeout)?;
        Ok(Arc::new(AppState {
            config,
            http,
            prom_metrics: Arc::new(prom_metrics::Metrics::new()),
        }))
    }

    /// A Paymo client for `api_key` over the shared connection pool.
    pub fn paymo_client(&self, api_key: &str) -> PaymoClient {
        PaymoClient::new(
            self.http.clone(),
            self.config.paymo.base_url.as_str(),
            api_key,
        )
        .with_metrics(Arc::clone(&self.prom_metrics))
    }
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`, both optional.
#[derive(Debug, Default, Deserialize)]
pub(super) struct WindowQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl WindowQuery {
    pub(super) fn window(&self) -> Result<DateWindow, ApiError> {
        Ok(DateWindow::parse(self.from.as_deref(), self.to.as_deref())?)
    }
}

/// Parse a numeric project id from a path segment.
pub(super) fn parse_project_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest("Invalid project id".to_string()))
}

/// Records request duration into the Prometheus histogram and runs the request
/// inside a span carrying the `x-request-id` (propagated or generated).
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let mut response = next.run(req).instrument(span).await;

    let duration = start.elapsed().as_secs_f64();
    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(duration);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Collapse numeric path segments into `:id` for metric labels.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()) {
                ":id".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route(
            "/api/login",
            axum::routing::post(routes_auth::handler_login).delete(routes_auth::handler_logout),
        )
        .route("/api/projects", get(routes_projects::handler_api_projects_list))
        .route(
            "/api/projects/{id}",
            get(routes_projects::handler_api_project_get),
        )
        .route("/api/entries", get(routes_paymo::handler_api_entries))
        .route("/api/invoices", get(routes_paymo::handler_api_invoices))
        .route("/api/reports", get(routes_paymo::handler_api_reports))
        .route(
            "/api/performance",
            get(routes_performance::handler_api_performance),
        )
        .route(
            "/api/performance/{id}",
            get(routes_performance::handler_api_performance_get),
        )
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/metrics", get(routes_health::handler_metrics));

    if let Some(dir) = state.config.static_dir.as_deref() {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    } else {
        app = app
            .route("/", get(routes_status::handler_index))
            .route("/login", get(routes_status::handler_login_page));
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware_auth::require_session,
    ))
    .layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(CatchPanicLayer::new())
    .layer(axum::middleware::from_fn_with_state(
        state.clone(),
        metrics_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(64 * 1024))
    .layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(120),
    ))
    .with_state(state)
}

pub async fn run(config: DashboardConfig) -> Result<()> {
    if config.paymo.api_key.is_none() {
        warn!("no default Paymo API key configured, requests need a session key");
    }
    if config.auth.dashboard_password.is_none() {
        warn!("no dashboard password configured, the dashboard is open to anyone");
    }
    let addr = format!("{}:{}", config.bind, config.port);
    let state = AppState::new(config)?;
    let app = build_router(state);

    info!(addr = %addr, "dashboard running");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("dashboard shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! { _ = ctrl_c => info!("received SIGINT, shutting down"), _ = sigterm.recv() => info!("received SIGTERM, shutting down") }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
                info!("received SIGINT, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}
