//! # Mock Paymo: Simulated Paymo API Server for Tests
//!
//! A lightweight, in-process HTTP server that mimics the parts of the Paymo
//! REST API the dashboard uses. Tests point a `PaymoClient` (or the whole
//! dashboard) at `mock.url()` and inspect the recorded requests afterwards.
//!
//! ## Supported Endpoints
//!
//! | Method | Path              | Behavior                                        |
//! |--------|-------------------|-------------------------------------------------|
//! | GET    | `/projects`       | Configured projects, `where=active=true` honored |
//! | GET    | `/projects/{id}`  | One configured project or 404                   |
//! | POST   | `/reports`        | Time report for the first id in `projects`      |
//! | GET    | `/reports`        | `{"reports": [...]}` listing                    |
//! | GET    | `/entries`        | Configured entries in pages of 100              |
//! | GET    | `/invoices`       | `{"invoices": [...]}`                           |
//!
//! Every request must carry HTTP basic auth `<api key>:X`; other credentials
//! get 401.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// API key the mock accepts unless reconfigured.
pub const DEFAULT_API_KEY: &str = "test-paymo-key";

const PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct MockState {
    valid_api_key: String,
    projects: Vec<Value>,
    /// Worked seconds returned by `POST /reports`, per project id.
    report_seconds: HashMap<i64, f64>,
    /// Project ids whose report requests fail with 500.
    failing_reports: HashSet<i64>,
    /// Remaining `POST /reports` calls answered with 429 before succeeding.
    rate_limited_reports: u32,
    /// When set, `GET /projects` returns this status.
    projects_error: Option<u16>,
    entries: Vec<Value>,
    invoices: Vec<Value>,
    /// Time each `POST /reports` is held open before answering.
    report_delay: Option<Duration>,

    // ── Request logs ────────────────────────────────────────────
    report_requests: Vec<Value>,
    project_queries: Vec<HashMap<String, String>>,
    entry_queries: Vec<HashMap<String, String>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            valid_api_key: DEFAULT_API_KEY.to_string(),
            projects: Vec::new(),
            report_seconds: HashMap::new(),
            failing_reports: HashSet::new(),
            rate_limited_reports: 0,
            projects_error: None,
            entries: Vec::new(),
            invoices: Vec::new(),
            report_delay: None,
            report_requests: Vec::new(),
            project_queries: Vec::new(),
            entry_queries: Vec::new(),
        }
    }
}

/// Concurrent `POST /reports` calls: current and peak.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

type SharedState = Arc<Mutex<MockState>>;

#[derive(Clone)]
struct AppState {
    mock: SharedState,
    reports_in_flight: Arc<InFlight>,
}

/// A running mock Paymo server on a random localhost port.
pub struct MockPaymo {
    base_url: String,
    _abort_handle: tokio::task::AbortHandle,
    state: SharedState,
    reports_in_flight: Arc<InFlight>,
}

impl MockPaymo {
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn builder() -> MockPaymoBuilder {
        MockPaymoBuilder {
            state: MockState::default(),
        }
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`.
    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    /// Every `POST /reports` body received, in arrival order.
    pub fn report_requests(&self) -> Vec<Value> {
        self.state.lock().unwrap().report_requests.clone()
    }

    /// Highest number of `POST /reports` requests that were open at once.
    pub fn peak_concurrent_reports(&self) -> usize {
        self.reports_in_flight.peak.load(Ordering::SeqCst)
    }

    /// Query strings of every `GET /projects` received.
    pub fn project_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().project_queries.clone()
    }

    /// Query strings of every `GET /entries` received.
    pub fn entry_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().entry_queries.clone()
    }
}

pub struct MockPaymoBuilder {
    state: MockState,
}

impl MockPaymoBuilder {
    /// Add a project record. `seconds` is what its time report returns.
    pub fn with_project(mut self, project: Value, seconds: f64) -> Self {
        let id = project["id"].as_i64().unwrap_or_default();
        self.state.report_seconds.insert(id, seconds);
        self.state.projects.push(project);
        self
    }

    /// Make time reports for `project_id` fail with 500.
    pub fn with_failing_report(mut self, project_id: i64) -> Self {
        self.state.failing_reports.insert(project_id);
        self
    }

    /// Answer the next `count` report requests with 429.
    pub fn with_rate_limited_reports(mut self, count: u32) -> Self {
        self.state.rate_limited_reports = count;
        self
    }

    /// Make `GET /projects` fail with `status`.
    pub fn with_projects_error(mut self, status: u16) -> Self {
        self.state.projects_error = Some(status);
        self
    }

    pub fn with_entries(mut self, entries: Vec<Value>) -> Self {
        self.state.entries = entries;
        self
    }

    pub fn with_invoices(mut self, invoices: Vec<Value>) -> Self {
        self.state.invoices = invoices;
        self
    }

    /// Hold every `POST /reports` open for `delay` before answering.
    pub fn with_report_delay(mut self, delay: Duration) -> Self {
        self.state.report_delay = Some(delay);
        self
    }

    pub fn with_valid_api_key(mut self, key: impl Into<String>) -> Self {
        self.state.valid_api_key = key.into();
        self
    }

    pub async fn start(self) -> MockPaymo {
        let shared_state: SharedState = Arc::new(Mutex::new(self.state));
        let reports_in_flight = Arc::new(InFlight::default());

        let app = Router::new()
            .route("/projects", get(handle_projects))
            .route("/projects/{id}", get(handle_project))
            .route("/reports", get(handle_reports_list).post(handle_report_create))
            .route("/entries", get(handle_entries))
            .route("/invoices", get(handle_invoices))
            .with_state(AppState {
                mock: Arc::clone(&shared_state),
                reports_in_flight: Arc::clone(&reports_in_flight),
            });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Paymo to random port");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("Failed to get mock Paymo local address");
        let base_url = format!("http://127.0.0.1:{}", addr.port());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock Paymo server failed");
        });

        MockPaymo {
            base_url,
            _abort_handle: handle.abort_handle(),
            state: shared_state,
            reports_in_flight,
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    let expected = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{}:X", state.valid_api_key))
    );
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Unauthorized"})),
    )
        .into_response()
}

fn error_status(status: u16) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(json!({"message": "mock failure"}))).into_response()
}

async fn handle_projects(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut s = app.mock.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    s.project_queries.push(params.clone());
    if let Some(status) = s.projects_error {
        return error_status(status);
    }
    let active_only = params.get("where").is_some_and(|w| w.contains("active=true"));
    let projects: Vec<Value> = s
        .projects
        .iter()
        .filter(|p| !active_only || p["active"] == json!(true))
        .cloned()
        .collect();
    Json(json!({ "projects": projects })).into_response()
}

async fn handle_project(
    State(app): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let s = app.mock.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    match s.projects.iter().find(|p| p["id"].as_i64() == Some(id)) {
        Some(p) => Json(json!({ "projects": [p] })).into_response(),
        None => error_status(404),
    }
}

async fn handle_report_create(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let delay = {
        let s = app.mock.lock().unwrap();
        if !authorized(&s, &headers) {
            return unauthorized();
        }
        s.report_delay
    };
    app.reports_in_flight.enter();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    let response = report_response(&mut app.mock.lock().unwrap(), body);
    app.reports_in_flight.leave();
    response
}

fn report_response(s: &mut MockState, body: Value) -> Response {
    s.report_requests.push(body.clone());
    if s.rate_limited_reports > 0 {
        s.rate_limited_reports -= 1;
        return error_status(429);
    }
    let project_id = body["projects"][0].as_i64().unwrap_or_default();
    if s.failing_reports.contains(&project_id) {
        return error_status(500);
    }
    let seconds = s.report_seconds.get(&project_id).copied().unwrap_or(0.0);
    Json(json!({
        "reports": [{
            "id": 1,
            "content": {"items": [{"id": project_id, "time": seconds}]}
        }]
    }))
    .into_response()
}

async fn handle_reports_list(State(app): State<AppState>, headers: HeaderMap) -> Response {
    let s = app.mock.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    Json(json!({"reports": [{"id": 1, "name": "Monthly"}]})).into_response()
}

async fn handle_entries(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut s = app.mock.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    s.entry_queries.push(params.clone());
    let page: usize = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1)
        .max(1);
    let items: Vec<Value> = s
        .entries
        .iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .cloned()
        .collect();
    Json(json!({ "entries": items })).into_response()
}

async fn handle_invoices(State(app): State<AppState>, headers: HeaderMap) -> Response {
    let s = app.mock.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    Json(json!({ "invoices": s.invoices })).into_response()
}
