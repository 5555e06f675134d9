//! Project API: active project listing and per-project detail.

use axum::extract::Path as AxumPath;
use axum::Json;

use super::middleware_auth::PaymoCredential;
use super::{parse_project_id, ApiError};
use crate::projects::{ProjectDetail, ProjectListItem};

/// GET /api/projects: active projects with their client names.
pub(super) async fn handler_api_projects_list(
    PaymoCredential(client): PaymoCredential,
) -> Result<Json<Vec<ProjectListItem>>, ApiError> {
    let projects = client
        .list_projects(Some("client"), Some("active=true"))
        .await
        .map_err(ApiError::upstream("Failed to fetch projects"))?;
    Ok(Json(projects.iter().map(ProjectListItem::from).collect()))
}

/// GET /api/projects/{id}: detail view with time worked and entry date span.
pub(super) async fn handler_api_project_get(
    PaymoCredential(client): PaymoCredential,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let id = parse_project_id(&id)?;
    let project = client
        .get_project(id, Some("client,tasks.entries"))
        .await
        .map_err(ApiError::upstream("Failed to fetch project details"))?;
    if !project.is_active() {
        return Err(ApiError::NotFound("Project not active".to_string()));
    }
    Ok(Json(ProjectDetail::from_project(&project)))
}
