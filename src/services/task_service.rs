use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::task::{ChecklistItem, Task, TaskStatus, TaskView};
use crate::error::ApiError;
use crate::policy::{self, Principal};
use crate::services::user_service::fetch_user_summaries;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub project: Option<Uuid>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub todo_checklist: Option<Vec<ChecklistItem>>,
}

/// Partial update: absent fields leave the stored value untouched
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
    pub project: Option<Uuid>,
    pub assigned_to: Option<Vec<Uuid>>,
    pub todo_checklist: Option<Vec<ChecklistItem>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusSummary {
    pub all: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Listing payload: the visible tasks plus counts over the same visibility
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListView {
    pub tasks: Vec<TaskView>,
    pub status_summary: TaskStatusSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub overdue: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub statistics: DashboardStats,
}

pub struct TaskService {
    pool: PgPool,
}

impl TaskService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Visible tasks, newest first, plus a status summary over the same
    /// scope. Admins see all tasks; members those assigned to them.
    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<TaskStatus>,
    ) -> Result<TaskListView, ApiError> {
        let scope = if principal.is_admin() {
            None
        } else {
            Some(principal.id)
        };

        let tasks = self.find_visible(scope, status).await?;

        let (all, pending, in_progress, completed) = tokio::try_join!(
            self.count_visible(scope, None),
            self.count_visible(scope, Some(TaskStatus::Pending)),
            self.count_visible(scope, Some(TaskStatus::InProgress)),
            self.count_visible(scope, Some(TaskStatus::Completed)),
        )?;

        Ok(TaskListView {
            tasks: self.views(tasks).await?,
            status_summary: TaskStatusSummary {
                all,
                pending,
                in_progress,
                completed,
            },
        })
    }

    pub async fn get_by_id(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<TaskView, ApiError> {
        let task = self.fetch(id).await?;
        policy::ensure_task_access(principal, &task)?;

        let mut views = self.views(vec![task]).await?;
        Ok(views.remove(0))
    }

    pub async fn create(
        &self,
        principal: &Principal,
        payload: TaskCreate,
    ) -> Result<TaskView, ApiError> {
        policy::require_admin(principal)?;

        let (title, due_date) = match (payload.title, payload.due_date) {
            (Some(title), Some(due_date)) if !title.is_empty() => (title, due_date),
            _ => return Err(ApiError::bad_request("Please provide title and due date")),
        };

        if let Some(project_id) = payload.project {
            self.ensure_project_exists(project_id).await?;
        }

        let task: Task = sqlx::query_as(
            "INSERT INTO tasks \
             (title, description, due_date, project_id, assigned_to, created_by, todo_checklist) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(&title)
        .bind(payload.description.unwrap_or_default())
        .bind(due_date)
        .bind(payload.project)
        .bind(payload.assigned_to.unwrap_or_default())
        .bind(principal.id)
        .bind(Json(payload.todo_checklist.unwrap_or_default()))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Task {} created by {}", task.id, principal.email);
        let mut views = self.views(vec![task]).await?;
        Ok(views.remove(0))
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: TaskPatch,
    ) -> Result<TaskView, ApiError> {
        policy::require_admin(principal)?;

        let mut task = self.fetch(id).await?;

        if let Some(project_id) = patch.project {
            self.ensure_project_exists(project_id).await?;
            task.project_id = Some(project_id);
        }
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = patch.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(todo_checklist) = patch.todo_checklist {
            task.todo_checklist = Json(todo_checklist);
        }

        let task = self.store(task).await?;
        let mut views = self.views(vec![task]).await?;
        Ok(views.remove(0))
    }

    /// Any of the three statuses is settable by an authorized actor; there
    /// is no transition state machine.
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<TaskView, ApiError> {
        let mut task = self.fetch(id).await?;
        policy::ensure_task_progress_access(principal, &task)?;

        task.status = status;
        let task = self.store(task).await?;
        let mut views = self.views(vec![task]).await?;
        Ok(views.remove(0))
    }

    /// Replace the ordered checklist wholesale
    pub async fn update_checklist(
        &self,
        principal: &Principal,
        id: Uuid,
        items: Vec<ChecklistItem>,
    ) -> Result<TaskView, ApiError> {
        let mut task = self.fetch(id).await?;
        policy::ensure_task_progress_access(principal, &task)?;

        task.todo_checklist = Json(items);
        let task = self.store(task).await?;
        let mut views = self.views(vec![task]).await?;
        Ok(views.remove(0))
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ApiError> {
        policy::require_admin(principal)?;

        let task = self.fetch(id).await?;
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task.id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Task {} deleted by {}", task.id, principal.email);
        Ok(())
    }

    /// Aggregate counts for the dashboard; `assignee` scopes to one user's
    /// tasks, `None` covers everything. All five counts run concurrently.
    pub async fn dashboard(&self, assignee: Option<Uuid>) -> Result<DashboardView, ApiError> {
        let (total, pending, in_progress, completed, overdue) = tokio::try_join!(
            self.count_visible(assignee, None),
            self.count_visible(assignee, Some(TaskStatus::Pending)),
            self.count_visible(assignee, Some(TaskStatus::InProgress)),
            self.count_visible(assignee, Some(TaskStatus::Completed)),
            self.count_overdue(assignee),
        )?;

        Ok(DashboardView {
            statistics: DashboardStats {
                total,
                pending,
                in_progress,
                completed,
                overdue,
            },
        })
    }

    /// Tasks of one project, newest first
    pub async fn find_by_project(
        &self,
        project_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, ApiError> {
        let tasks: Vec<Task> = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE project_id = $1 AND status = $2 \
                     ORDER BY created_at DESC",
                )
                .bind(project_id)
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE project_id = $1 ORDER BY created_at DESC",
                )
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(tasks)
    }

    pub async fn count_by_project(
        &self,
        project_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<i64, ApiError> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM tasks WHERE project_id = $1 AND status = $2",
                )
                .bind(project_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
                    .bind(project_id)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Resolve assignees and creators for a batch of tasks in one query
    pub async fn views(&self, tasks: Vec<Task>) -> Result<Vec<TaskView>, ApiError> {
        let mut user_ids: Vec<Uuid> = tasks
            .iter()
            .flat_map(|t| {
                t.assigned_to
                    .iter()
                    .copied()
                    .chain(std::iter::once(t.created_by))
            })
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let users = fetch_user_summaries(&self.pool, &user_ids).await?;
        Ok(tasks
            .into_iter()
            .map(|task| TaskView::new(task, &users))
            .collect())
    }

    async fn find_visible(
        &self,
        assignee: Option<Uuid>,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, ApiError> {
        let tasks: Vec<Task> = match (assignee, status) {
            (Some(user_id), Some(status)) => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE $1 = ANY(assigned_to) AND status = $2 \
                     ORDER BY created_at DESC",
                )
                .bind(user_id)
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(user_id), None) => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE $1 = ANY(assigned_to) ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(status)) => {
                sqlx::query_as("SELECT * FROM tasks WHERE status = $1 ORDER BY created_at DESC")
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            (None, None) => {
                sqlx::query_as("SELECT * FROM tasks ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(tasks)
    }

    async fn count_visible(
        &self,
        assignee: Option<Uuid>,
        status: Option<TaskStatus>,
    ) -> Result<i64, ApiError> {
        let count: i64 = match (assignee, status) {
            (Some(user_id), Some(status)) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM tasks WHERE $1 = ANY(assigned_to) AND status = $2",
                )
                .bind(user_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await?
            }
            (Some(user_id), None) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE $1 = ANY(assigned_to)")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await?
            }
            (None, Some(status)) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status = $1")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            (None, None) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// Past due date and not completed
    async fn count_overdue(&self, assignee: Option<Uuid>) -> Result<i64, ApiError> {
        let count: i64 = match assignee {
            Some(user_id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM tasks WHERE due_date < CURRENT_DATE \
                     AND status <> $1 AND $2 = ANY(assigned_to)",
                )
                .bind(TaskStatus::Completed)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM tasks WHERE due_date < CURRENT_DATE AND status <> $1",
                )
                .bind(TaskStatus::Completed)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count)
    }

    async fn store(&self, task: Task) -> Result<Task, ApiError> {
        let task: Task = sqlx::query_as(
            "UPDATE tasks SET title = $1, description = $2, status = $3, due_date = $4, \
             project_id = $5, assigned_to = $6, todo_checklist = $7, updated_at = now() \
             WHERE id = $8 RETURNING *",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status)
        .bind(task.due_date)
        .bind(task.project_id)
        .bind(&task.assigned_to)
        .bind(&task.todo_checklist)
        .bind(task.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    async fn fetch(&self, id: Uuid) -> Result<Task, ApiError> {
        let task: Option<Task> = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        task.ok_or_else(|| ApiError::not_found("Task not found"))
    }

    async fn ensure_project_exists(&self, project_id: Uuid) -> Result<(), ApiError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
                .bind(project_id)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Ok(())
        } else {
            Err(ApiError::not_found("Project not found"))
        }
    }
}
