use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::project::{ProjectStatsView, ProjectStatus, ProjectView};
use crate::database::models::task::{TaskStatus, TaskView};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::policy::Principal;
use crate::services::project_service::{ProjectCreate, ProjectPatch, ProjectService};

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectTasksQuery {
    pub status: Option<TaskStatus>,
}

/// GET /api/projects - visible projects with task stats
pub async fn list(
    Extension(principal): Extension<Principal>,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Vec<ProjectView>> {
    let service = ProjectService::new().await?;
    let projects = service.list(&principal, query.status).await?;
    Ok(ApiResponse::list(projects))
}

/// GET /api/projects/:id - project with tasks and stats
pub async fn get(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProjectView> {
    let service = ProjectService::new().await?;
    let project = service.get_by_id(&principal, id).await?;
    Ok(ApiResponse::success(project))
}

/// POST /api/projects - admin only
pub async fn create(
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ProjectCreate>,
) -> ApiResult<ProjectView> {
    let service = ProjectService::new().await?;
    let project = service.create(&principal, payload).await?;
    Ok(ApiResponse::created(project, "Project created successfully"))
}

/// PUT /api/projects/:id - partial update, admin only
pub async fn update(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProjectPatch>,
) -> ApiResult<ProjectView> {
    let service = ProjectService::new().await?;
    let project = service.update(&principal, id, patch).await?;
    Ok(ApiResponse::with_message(project, "Project updated successfully"))
}

/// DELETE /api/projects/:id - admin only, blocked while tasks exist
pub async fn remove(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let service = ProjectService::new().await?;
    service.delete(&principal, id).await?;
    Ok(ApiResponse::message_only("Project deleted successfully"))
}

/// GET /api/projects/:id/tasks
pub async fn tasks(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProjectTasksQuery>,
) -> ApiResult<Vec<TaskView>> {
    let service = ProjectService::new().await?;
    let tasks = service.get_tasks(&principal, id, query.status).await?;
    Ok(ApiResponse::list(tasks))
}

/// GET /api/projects/:id/stats
pub async fn stats(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProjectStatsView> {
    let service = ProjectService::new().await?;
    let stats = service.get_stats(&principal, id).await?;
    Ok(ApiResponse::success(stats))
}
