//! Pass-through proxies for Paymo collections.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::middleware_auth::PaymoCredential;
use super::{ApiError, WindowQuery};

#[derive(Debug, Default, Deserialize)]
pub(super) struct EntriesQuery {
    project_id: Option<i64>,
    from: Option<String>,
    to: Option<String>,
}

/// GET /api/entries: every time entry matching the optional project and
/// date range, collected across pages.
pub(super) async fn handler_api_entries(
    PaymoCredential(client): PaymoCredential,
    Query(params): Query<EntriesQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let window = WindowQuery {
        from: params.from,
        to: params.to,
    }
    .window()?;
    let filter = window.entries_filter(params.project_id);
    let entries = client
        .fetch_all_time_entries(filter.as_deref())
        .await
        .map_err(ApiError::upstream("Failed to fetch entries"))?;
    Ok(Json(entries))
}

/// GET /api/invoices
pub(super) async fn handler_api_invoices(
    PaymoCredential(client): PaymoCredential,
) -> Result<Json<Value>, ApiError> {
    client
        .list_collection("invoices", "invoices")
        .await
        .map(Json)
        .map_err(ApiError::upstream("Failed to fetch invoices"))
}

/// GET /api/reports
pub(super) async fn handler_api_reports(
    PaymoCredential(client): PaymoCredential,
) -> Result<Json<Value>, ApiError> {
    client
        .list_collection("reports", "reports")
        .await
        .map(Json)
        .map_err(ApiError::upstream("Failed to fetch reports"))
}
