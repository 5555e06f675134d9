//! Budget performance API.
//!
//! `GET /api/performance?from=&to=` returns one summary per project, in the
//! order Paymo lists them. `GET /api/performance/{id}` returns a single
//! summary. Both accept an optional `YYYY-MM-DD` window; without one, all
//! recorded time counts.

use axum::extract::{Path as AxumPath, Query, State};
use axum::Json;
use std::sync::Arc;

use super::middleware_auth::PaymoCredential;
use super::{parse_project_id, ApiError, AppState, WindowQuery};
use crate::performance::{project_performance, single_project_performance, PerformanceSummary};

pub(super) async fn handler_api_performance(
    State(state): State<Arc<AppState>>,
    PaymoCredential(client): PaymoCredential,
    Query(params): Query<WindowQuery>,
) -> Result<Json<Vec<PerformanceSummary>>, ApiError> {
    let window = params.window()?;
    let summaries = project_performance(&client, &window, &state.config.performance)
        .await
        .map_err(ApiError::upstream("Failed to compute performance"))?;
    Ok(Json(summaries))
}

pub(super) async fn handler_api_performance_get(
    State(state): State<Arc<AppState>>,
    PaymoCredential(client): PaymoCredential,
    AxumPath(id): AxumPath<String>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<PerformanceSummary>, ApiError> {
    let id = parse_project_id(&id)?;
    let window = params.window()?;
    let summary = single_project_performance(&client, id, &window, &state.config.performance)
        .await
        .map_err(ApiError::upstream("Failed to compute performance"))?;
    Ok(Json(summary))
}
