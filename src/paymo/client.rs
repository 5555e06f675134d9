//! HTTP client for the Paymo REST API.

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{unwrap_collection, Project, UpstreamError};
use crate::prom_metrics::{Metrics, UpstreamLabel};

/// Paymo returns at most this many entries per page.
pub const ENTRIES_PAGE_SIZE: usize = 100;
/// Hard stop for paginated entry fetches.
pub const MAX_ENTRY_PAGES: u32 = 50;

/// Build the connection pool shared by every per-request [`PaymoClient`].
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, UpstreamError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("paymo-dashboard/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// A Paymo client bound to one API key.
#[derive(Clone)]
pub struct PaymoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    metrics: Option<Arc<Metrics>>,
}

impl std::fmt::Debug for PaymoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymoClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl PaymoClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        PaymoClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            metrics: None,
        }
    }

    /// Count every upstream request in `metrics`, labelled by endpoint and outcome.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn execute(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, UpstreamError> {
        let result = self.execute_inner(request).await;
        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(_) => "ok",
                Err(e) => e.outcome(),
            };
            metrics
                .upstream_requests
                .get_or_create(&UpstreamLabel {
                    endpoint: endpoint.to_string(),
                    outcome: outcome.to_string(),
                })
                .inc();
        }
        result
    }

    async fn execute_inner(&self, request: reqwest::RequestBuilder) -> Result<Value, UpstreamError> {
        let response = request
            .basic_auth(&self.api_key, Some("X"))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        let path = response.url().path().to_string();
        debug!(status = status.as_u16(), path = %path, "paymo response");

        match status {
            StatusCode::TOO_MANY_REQUESTS => return Err(UpstreamError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(UpstreamError::Unauthorized(status.as_u16()))
            }
            StatusCode::NOT_FOUND => return Err(UpstreamError::NotFound(path)),
            _ => {}
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&bytes).chars().take(200).collect();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// GET `path` with query parameters and return the decoded JSON body.
    pub async fn get(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, UpstreamError> {
        let request = self.http.get(self.url(path)).query(query);
        self.execute(endpoint, request).await
    }

    /// POST a JSON body to `path` and return the decoded JSON body.
    pub async fn post(
        &self,
        endpoint: &'static str,
        path: &str,
        body: &Value,
    ) -> Result<Value, UpstreamError> {
        let request = self.http.post(self.url(path)).json(body);
        self.execute(endpoint, request).await
    }

    /// List projects. `include` expands nested resources (`"tasks"`,
    /// `"client"`), `filter` is a Paymo `where` expression.
    ///
    /// Records that cannot be read as a project (e.g. no numeric id) are
    /// skipped with a warning rather than failing the whole listing.
    pub async fn list_projects(
        &self,
        include: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Vec<Project>, UpstreamError> {
        let mut query = Vec::new();
        if let Some(include) = include {
            query.push(("include", include.to_string()));
        }
        if let Some(filter) = filter {
            query.push(("where", filter.to_string()));
        }
        let body = self.get("projects", "/projects", &query).await?;
        let raw: Vec<Value> = match unwrap_collection(body, "projects") {
            Value::Array(items) => items,
            other => {
                warn!(kind = %json_kind(&other), "project listing was not a list");
                Vec::new()
            }
        };
        Ok(raw
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Project>(item) {
                Ok(project) => Some(project),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable project record");
                    None
                }
            })
            .collect())
    }

    /// Fetch one project by id.
    pub async fn get_project(
        &self,
        id: i64,
        include: Option<&str>,
    ) -> Result<Project, UpstreamError> {
        let query: Vec<(&str, String)> = include
            .map(|i| vec![("include", i.to_string())])
            .unwrap_or_default();
        let path = format!("/projects/{id}");
        let body = self.get("project", &path, &query).await?;
        match unwrap_collection(body, "projects") {
            Value::Array(mut items) => {
                if items.is_empty() {
                    return Err(UpstreamError::NotFound(path));
                }
                Ok(serde_json::from_value(items.swap_remove(0))?)
            }
            single => Ok(serde_json::from_value(single)?),
        }
    }

    /// Fetch one page of time entries. Returns the items and whether the
    /// response advertised a next page.
    pub async fn list_entries_page(
        &self,
        filter: Option<&str>,
        page: u32,
    ) -> Result<(Vec<Value>, bool), UpstreamError> {
        let mut query = vec![("page", page.to_string())];
        if let Some(filter) = filter {
            query.push(("where", filter.to_string()));
        }
        let body = self.get("entries", "/entries", &query).await?;
        let has_next = body
            .get("meta")
            .and_then(|m| m.get("next"))
            .is_some_and(|next| !next.is_null() && next != &Value::Bool(false));
        let items = match unwrap_collection(body, "entries") {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        Ok((items, has_next))
    }

    /// Fetch every time entry matching `filter`, page by page.
    ///
    /// Stops on an empty page, on a short page without a `meta.next` marker,
    /// or after [`MAX_ENTRY_PAGES`] pages.
    pub async fn fetch_all_time_entries(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<Value>, UpstreamError> {
        let mut all = Vec::new();
        for page in 1..=MAX_ENTRY_PAGES {
            let (items, has_next) = self.list_entries_page(filter, page).await?;
            if items.is_empty() {
                break;
            }
            let short_page = items.len() < ENTRIES_PAGE_SIZE;
            all.extend(items);
            if short_page && !has_next {
                break;
            }
            if page == MAX_ENTRY_PAGES {
                warn!(pages = MAX_ENTRY_PAGES, "entry pagination cap reached");
            }
        }
        Ok(all)
    }

    /// GET a top-level collection (`/invoices`, `/reports`) and strip its envelope.
    pub async fn list_collection(
        &self,
        endpoint: &'static str,
        key: &str,
    ) -> Result<Value, UpstreamError> {
        let body = self.get(endpoint, &format!("/{key}"), &[]).await?;
        Ok(unwrap_collection(body, key))
    }

    /// Create a temporary aggregation report (`POST /reports`).
    pub async fn create_report(&self, query: &Value) -> Result<Value, UpstreamError> {
        self.post("report_create", "/reports", query).await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
