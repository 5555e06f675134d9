//! # Time: Worked-Time Lookups
//!
//! Obtains the total seconds logged against a project from Paymo's report
//! endpoint. Each lookup creates one temporary report scoped to a single
//! project and an optional date window, then reads the project's `time` total
//! out of `reports[0].content.items`.
//!
//! Lookups never fail outward: rate limiting (HTTP 429) is retried after a
//! fixed backoff up to [`RetryPolicy::max_retries`] times, and every other
//! failure (or an exhausted retry budget) degrades to `0` seconds.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::paymo::{value_as_f64, value_as_i64, PaymoClient, UpstreamError};

// ── Date Windows ────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
pub enum DateWindowError {
    #[error("invalid {field} date '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error("'from' date {from} is after 'to' date {to}")]
    Inverted { from: NaiveDate, to: NaiveDate },
}

/// Inclusive calendar-date bounds. Either side may be open; both open means
/// "all time".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn all_time() -> Self {
        Self::default()
    }

    /// Parse optional `YYYY-MM-DD` strings. Empty strings count as absent.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, DateWindowError> {
        let from = parse_date("from", from)?;
        let to = parse_date("to", to)?;
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(DateWindowError::Inverted { from, to });
            }
        }
        Ok(DateWindow { from, to })
    }

    pub fn is_all_time(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// `from` at 00:00:00 UTC.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.from.map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    /// `to` at 23:59:59 UTC.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc())
    }

    /// Paymo `where` expression for `/entries`, optionally scoped to a project.
    pub fn entries_filter(&self, project_id: Option<i64>) -> Option<String> {
        let mut clauses = Vec::new();
        if let Some(id) = project_id {
            clauses.push(format!("project_id={id}"));
        }
        if let Some(from) = self.from {
            clauses.push(format!("date>=\"{}\"", from.format("%Y-%m-%d")));
        }
        if let Some(to) = self.to {
            clauses.push(format!("date<=\"{}\"", to.format("%Y-%m-%d")));
        }
        (!clauses.is_empty()).then(|| clauses.join(" and "))
    }
}

fn parse_date(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, DateWindowError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| DateWindowError::InvalidDate {
                field,
                value: s.to_string(),
            }),
    }
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ── Report Queries ──────────────────────────────────────────────

/// Body for `POST /reports` asking for one project's time totals.
///
/// All-time windows use `date_interval: "all_time"`; bounded windows send
/// `start_date` / `end_date` timestamps for whichever sides are set.
pub fn report_query(project_id: i64, window: &DateWindow) -> Value {
    let mut query = json!({
        "type": "temp",
        "scope": "temp",
        "projects": [project_id],
        "users": "all",
        "include": {
            "days": false,
            "clients": false,
            "projects": true,
            "tasks": false,
            "users": false,
            "entries": false,
        },
    });
    if window.is_all_time() {
        query["date_interval"] = json!("all_time");
    } else {
        if let Some(start) = window.start() {
            query["start_date"] = json!(timestamp(start));
        }
        if let Some(end) = window.end() {
            query["end_date"] = json!(timestamp(end));
        }
    }
    query
}

/// Read the worked seconds for `project_id` out of a report response.
///
/// An item whose `id` (or `project_id`) matches wins. Otherwise the report is
/// scoped to the one project, so items carrying no id are summed as its
/// aggregate total. Returns `0.0` when neither shape yields a usable,
/// non-negative `time`.
pub fn extract_total_seconds(report: &Value, project_id: i64) -> f64 {
    let items = report
        .get("reports")
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("content"))
        .and_then(|c| c.get("items"))
        .and_then(Value::as_array);
    let Some(items) = items else {
        return 0.0;
    };
    let item_id = |item: &Value| {
        item.get("id")
            .or_else(|| item.get("project_id"))
            .and_then(value_as_i64)
    };
    let item_seconds = |item: &Value| {
        item.get("time")
            .and_then(value_as_f64)
            .filter(|secs| *secs >= 0.0)
    };

    if let Some(item) = items.iter().find(|item| item_id(item) == Some(project_id)) {
        return item_seconds(item).unwrap_or(0.0);
    }
    items
        .iter()
        .filter(|item| item_id(item).is_none())
        .filter_map(item_seconds)
        .sum()
}

// ── Lookups ─────────────────────────────────────────────────────

/// Rate-limit handling for a single lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait before each retry.
    pub backoff: Duration,
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            backoff: Duration::from_secs(2),
            max_retries: 3,
        }
    }
}

/// Worked seconds for a project, surfacing the final upstream error.
pub async fn try_fetch_worked_seconds(
    client: &PaymoClient,
    project_id: i64,
    window: &DateWindow,
    policy: &RetryPolicy,
) -> Result<f64, UpstreamError> {
    let query = report_query(project_id, window);
    let mut retries = 0u32;
    loop {
        match client.create_report(&query).await {
            Ok(report) => return Ok(extract_total_seconds(&report, project_id)),
            Err(e) if e.is_rate_limited() && retries < policy.max_retries => {
                retries += 1;
                debug!(
                    project_id,
                    retry = retries,
                    backoff_ms = policy.backoff.as_millis() as u64,
                    "rate limited, backing off"
                );
                if let Some(metrics) = client.metrics() {
                    metrics.rate_limit_retries.inc();
                }
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Worked seconds for a project. Any failure is logged and reported as `0`.
pub async fn fetch_worked_seconds(
    client: &PaymoClient,
    project_id: i64,
    window: &DateWindow,
    policy: &RetryPolicy,
) -> f64 {
    match try_fetch_worked_seconds(client, project_id, window, policy).await {
        Ok(seconds) => seconds,
        Err(e) => {
            warn!(project_id, error = %e, "time lookup failed, reporting 0 seconds");
            if let Some(metrics) = client.metrics() {
                metrics.time_lookup_fallbacks.inc();
            }
            0.0
        }
    }
}

/// Render seconds as `"<h>h <m>m"`, truncating partial minutes.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}h {minutes}m")
}
