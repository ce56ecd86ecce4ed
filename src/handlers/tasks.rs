use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::task::{ChecklistItem, TaskStatus, TaskView};
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::policy::{self, Principal};
use crate::services::task_service::{DashboardView, TaskCreate, TaskListView, TaskPatch, TaskService};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistUpdateRequest {
    pub todo_checklist: Option<Vec<ChecklistItem>>,
}

/// GET /api/tasks - visible tasks plus a status summary
pub async fn list(
    Extension(principal): Extension<Principal>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<TaskListView> {
    let service = TaskService::new().await?;
    let listing = service.list(&principal, query.status).await?;
    Ok(ApiResponse::success(listing))
}

/// GET /api/tasks/:id
pub async fn get(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<TaskView> {
    let service = TaskService::new().await?;
    let task = service.get_by_id(&principal, id).await?;
    Ok(ApiResponse::success(task))
}

/// POST /api/tasks - admin only
pub async fn create(
    Extension(principal): Extension<Principal>,
    Json(payload): Json<TaskCreate>,
) -> ApiResult<TaskView> {
    let service = TaskService::new().await?;
    let task = service.create(&principal, payload).await?;
    Ok(ApiResponse::created(task, "Task created successfully"))
}

/// PUT /api/tasks/:id - partial update, admin only
pub async fn update(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<TaskView> {
    let service = TaskService::new().await?;
    let task = service.update(&principal, id, patch).await?;
    Ok(ApiResponse::with_message(task, "Task updated successfully"))
}

/// DELETE /api/tasks/:id - admin only
pub async fn remove(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let service = TaskService::new().await?;
    service.delete(&principal, id).await?;
    Ok(ApiResponse::message_only("Task deleted successfully"))
}

/// PUT /api/tasks/:id/status - admin or assigned member
pub async fn update_status(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> ApiResult<TaskView> {
    let status = payload
        .status
        .ok_or_else(|| ApiError::bad_request("Please provide status"))?;

    let service = TaskService::new().await?;
    let task = service.update_status(&principal, id, status).await?;
    Ok(ApiResponse::with_message(task, "Task status updated successfully"))
}

/// PUT /api/tasks/:id/todo - admin or assigned member
pub async fn update_checklist(
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChecklistUpdateRequest>,
) -> ApiResult<TaskView> {
    let items = payload
        .todo_checklist
        .ok_or_else(|| ApiError::bad_request("Please provide todoChecklist"))?;

    let service = TaskService::new().await?;
    let task = service.update_checklist(&principal, id, items).await?;
    Ok(ApiResponse::with_message(task, "Task checklist updated successfully"))
}

/// GET /api/tasks/dashboard-data - admin aggregate
pub async fn dashboard(Extension(principal): Extension<Principal>) -> ApiResult<DashboardView> {
    policy::require_admin(&principal)?;

    let service = TaskService::new().await?;
    let dashboard = service.dashboard(None).await?;
    Ok(ApiResponse::success(dashboard))
}

/// GET /api/tasks/user-dashboard-data - the caller's own aggregate
pub async fn user_dashboard(
    Extension(principal): Extension<Principal>,
) -> ApiResult<DashboardView> {
    let service = TaskService::new().await?;
    let dashboard = service.dashboard(Some(principal.id)).await?;
    Ok(ApiResponse::success(dashboard))
}
