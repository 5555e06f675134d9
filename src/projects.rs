//! Project list and detail views built from upstream project records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::paymo::{Project, TimeEntry};
use crate::time::format_duration;

/// One row of the active-project listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectListItem {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub client_name: String,
    pub color: Option<String>,
    pub updated_on: Option<String>,
    pub active: bool,
}

impl From<&Project> for ProjectListItem {
    fn from(p: &Project) -> Self {
        ProjectListItem {
            id: p.id,
            name: p.name.clone(),
            code: p.code.clone(),
            client_name: p.client_name().to_string(),
            color: p.color.clone(),
            updated_on: p.updated_on.clone(),
            active: p.is_active(),
        }
    }
}

/// Detail view for a single project, including time worked across its
/// task entries and the span of dates those entries cover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDetail {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub client_name: String,
    pub active: bool,
    pub budget_hours: Option<f64>,
    pub price_per_hour: Option<f64>,
    /// Fixed price for flat billing, otherwise hourly rate × hours worked.
    pub project_fee: Option<f64>,
    /// Seconds.
    pub time_worked: f64,
    /// Seconds; same as `time_worked`.
    pub recorded_time: f64,
    /// `time_worked` as `"<h>h <m>m"`.
    pub time_worked_display: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `flat`, `pph` (price per hour), `non` (not billable), or Paymo's own value.
    pub billing_type: String,
    pub updated_on: Option<String>,
    pub color: Option<String>,
}

impl ProjectDetail {
    /// Build the detail view. `project` should carry `tasks.entries`.
    pub fn from_project(p: &Project) -> Self {
        let entries: Vec<&TimeEntry> = p.task_entries().collect();
        let time_worked: f64 = entries.iter().map(|e| e.duration.unwrap_or(0.0)).sum();
        let span = entry_span(&entries);

        let project_fee = if p.is_flat_billing() {
            p.price.or(p.estimated_price)
        } else {
            Some(p.price_per_hour.unwrap_or(0.0) * (time_worked / 3600.0))
        };

        ProjectDetail {
            id: p.id,
            name: p.name.clone(),
            code: p.code.clone(),
            client_name: p.client_name().to_string(),
            active: p.is_active(),
            budget_hours: p.budget_hours,
            price_per_hour: p.price_per_hour,
            project_fee,
            time_worked,
            recorded_time: time_worked,
            time_worked_display: format_duration(time_worked.max(0.0) as u64),
            start_date: span
                .map(|(start, _)| iso(start))
                .or_else(|| p.start_date.clone())
                .or_else(|| p.created_on.clone()),
            end_date: span.map(|(_, end)| iso(end)).or_else(|| p.end_date.clone()),
            billing_type: billing_type(p),
            updated_on: p.updated_on.clone(),
            color: p.color.clone(),
        }
    }
}

pub fn billing_type(p: &Project) -> String {
    if let Some(kind) = p.billing_type.as_deref().filter(|k| !k.is_empty()) {
        return kind.to_string();
    }
    let kind = match (p.billable.unwrap_or(false), p.is_flat_billing()) {
        (false, _) => "non",
        (true, true) => "flat",
        (true, false) => "pph",
    };
    kind.to_string()
}

/// Earliest start and latest end across entries. An entry starts at
/// `start_time` (or its `date`) and ends at `end_time` (or its start).
pub fn entry_span(entries: &[&TimeEntry]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut span: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
    for entry in entries {
        let Some(start) = entry
            .start_time
            .as_deref()
            .or(entry.date.as_deref())
            .and_then(parse_timestamp)
        else {
            continue;
        };
        let end = entry
            .end_time
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(start);
        span = Some(match span {
            None => (start, end),
            Some((lo, hi)) => (lo.min(start), hi.max(end)),
        });
    }
    span
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
