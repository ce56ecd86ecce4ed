use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::project::{
    Project, ProjectPriority, ProjectStatsView, ProjectStatus, ProjectView, TaskStats,
};
use crate::database::models::task::{TaskStatus, TaskView};
use crate::error::ApiError;
use crate::policy::{self, Principal};
use crate::services::task_service::TaskService;
use crate::services::user_service::fetch_user_summaries;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub team_members: Option<Vec<Uuid>>,
    pub priority: Option<ProjectPriority>,
    pub budget: Option<f64>,
    pub status: Option<ProjectStatus>,
}

/// Partial update: every field optional, absent fields leave the stored
/// value untouched. `Some(0)` for budget or progress is a real update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub team_members: Option<Vec<Uuid>>,
    pub priority: Option<ProjectPriority>,
    pub budget: Option<f64>,
    pub progress: Option<i32>,
}

/// Field-by-field merge of a patch into an existing project
fn apply_patch(project: &mut Project, patch: ProjectPatch) {
    if let Some(name) = patch.name {
        project.name = name;
    }
    if let Some(description) = patch.description {
        project.description = description;
    }
    if let Some(status) = patch.status {
        project.status = status;
    }
    if let Some(start_date) = patch.start_date {
        project.start_date = start_date;
    }
    if let Some(end_date) = patch.end_date {
        project.end_date = end_date;
    }
    if let Some(team_members) = patch.team_members {
        project.team_members = team_members;
    }
    if let Some(priority) = patch.priority {
        project.priority = priority;
    }
    if let Some(budget) = patch.budget {
        project.budget = budget;
    }
    if let Some(progress) = patch.progress {
        project.progress = progress;
    }
}

/// Equal dates are allowed; only a start strictly after the end is invalid
fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if start > end {
        return Err(ApiError::bad_request("End date must be after start date"));
    }
    Ok(())
}

pub struct ProjectService {
    pool: PgPool,
    tasks: TaskService,
}

impl ProjectService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        let tasks = TaskService::with_pool(pool.clone());
        Ok(Self { pool, tasks })
    }

    /// Visible projects, newest first, each enriched with task counts.
    /// Admins see everything; members only projects whose team they are on.
    pub async fn list(
        &self,
        principal: &Principal,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<ProjectView>, ApiError> {
        let projects: Vec<Project> = match (principal.is_admin(), status) {
            (true, Some(status)) => {
                sqlx::query_as(
                    "SELECT * FROM projects WHERE status = $1 ORDER BY created_at DESC",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            (true, None) => {
                sqlx::query_as("SELECT * FROM projects ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
            (false, Some(status)) => {
                sqlx::query_as(
                    "SELECT * FROM projects WHERE status = $1 AND $2 = ANY(team_members) \
                     ORDER BY created_at DESC",
                )
                .bind(status)
                .bind(principal.id)
                .fetch_all(&self.pool)
                .await?
            }
            (false, None) => {
                sqlx::query_as(
                    "SELECT * FROM projects WHERE $1 = ANY(team_members) \
                     ORDER BY created_at DESC",
                )
                .bind(principal.id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        // Scatter the per-project counts, then join users once for the batch
        let stats = futures::future::try_join_all(
            projects.iter().map(|p| self.task_stats(p.id)),
        )
        .await?;

        let users = fetch_user_summaries(&self.pool, &related_user_ids(&projects)).await?;

        Ok(projects
            .into_iter()
            .zip(stats)
            .map(|(project, stats)| {
                let mut view = ProjectView::new(project, &users);
                view.task_stats = Some(stats);
                view
            })
            .collect())
    }

    /// Single project with its full task list and task counts
    pub async fn get_by_id(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<ProjectView, ApiError> {
        let project = self.fetch(id).await?;
        policy::ensure_project_access(principal, &project)?;

        let (tasks, stats) = tokio::try_join!(
            self.tasks.find_by_project(id, None),
            self.task_stats(id),
        )?;

        let mut user_ids = related_user_ids(std::slice::from_ref(&project));
        user_ids.extend(tasks.iter().flat_map(|t| {
            t.assigned_to
                .iter()
                .copied()
                .chain(std::iter::once(t.created_by))
        }));
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = fetch_user_summaries(&self.pool, &user_ids).await?;

        let task_views = tasks
            .into_iter()
            .map(|task| TaskView::new(task, &users))
            .collect();

        let mut view = ProjectView::new(project, &users);
        view.task_stats = Some(stats);
        view.tasks = Some(task_views);
        Ok(view)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        payload: ProjectCreate,
    ) -> Result<ProjectView, ApiError> {
        policy::require_admin(principal)?;

        let (name, description, start_date, end_date) = match (
            payload.name,
            payload.description,
            payload.start_date,
            payload.end_date,
        ) {
            (Some(name), Some(description), Some(start_date), Some(end_date)) => {
                (name, description, start_date, end_date)
            }
            _ => {
                return Err(ApiError::bad_request(
                    "Please provide name, description, start date, and end date",
                ))
            }
        };
        validate_date_range(start_date, end_date)?;

        let project: Project = sqlx::query_as(
            "INSERT INTO projects \
             (name, description, status, priority, start_date, end_date, budget, created_by, team_members) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(&name)
        .bind(&description)
        .bind(payload.status.unwrap_or(ProjectStatus::Planning))
        .bind(payload.priority.unwrap_or(ProjectPriority::Medium))
        .bind(start_date)
        .bind(end_date)
        .bind(payload.budget.unwrap_or(0.0))
        .bind(principal.id)
        .bind(payload.team_members.unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Project {} created by {}", project.id, principal.email);
        self.view_of(project).await
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: ProjectPatch,
    ) -> Result<ProjectView, ApiError> {
        policy::require_admin(principal)?;

        let mut project = self.fetch(id).await?;
        apply_patch(&mut project, patch);
        validate_date_range(project.start_date, project.end_date)?;

        let project: Project = sqlx::query_as(
            "UPDATE projects SET name = $1, description = $2, status = $3, priority = $4, \
             start_date = $5, end_date = $6, budget = $7, progress = $8, team_members = $9, \
             updated_at = now() WHERE id = $10 RETURNING *",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(project.priority)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.budget)
        .bind(project.progress)
        .bind(&project.team_members)
        .bind(project.id)
        .fetch_one(&self.pool)
        .await?;

        self.view_of(project).await
    }

    /// Delete a project unless tasks still reference it. The count and the
    /// delete are two statements, not a transaction: a task created in
    /// between can slip past the guard.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), ApiError> {
        policy::require_admin(principal)?;

        let project = self.fetch(id).await?;

        let task_count = self.tasks.count_by_project(project.id, None).await?;
        if task_count > 0 {
            return Err(ApiError::conflict(format!(
                "Cannot delete project. It has {} task(s). Please delete or reassign tasks first.",
                task_count
            )));
        }

        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(project.id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Project {} deleted by {}", project.id, principal.email);
        Ok(())
    }

    /// Tasks of one project, gated by the same visibility rule as get_by_id
    pub async fn get_tasks(
        &self,
        principal: &Principal,
        id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<TaskView>, ApiError> {
        let project = self.fetch(id).await?;
        policy::ensure_project_access(principal, &project)?;

        let tasks = self.tasks.find_by_project(id, status).await?;
        self.tasks.views(tasks).await
    }

    pub async fn get_stats(
        &self,
        principal: &Principal,
        id: Uuid,
    ) -> Result<ProjectStatsView, ApiError> {
        let project = self.fetch(id).await?;
        policy::ensure_project_access(principal, &project)?;

        let stats = self.task_stats(id).await?;
        Ok(ProjectStatsView::from(stats))
    }

    /// The four per-project counts, issued concurrently
    async fn task_stats(&self, project_id: Uuid) -> Result<TaskStats, ApiError> {
        let (total, completed, pending, in_progress) = tokio::try_join!(
            self.tasks.count_by_project(project_id, None),
            self.tasks.count_by_project(project_id, Some(TaskStatus::Completed)),
            self.tasks.count_by_project(project_id, Some(TaskStatus::Pending)),
            self.tasks.count_by_project(project_id, Some(TaskStatus::InProgress)),
        )?;

        Ok(TaskStats {
            total,
            completed,
            pending,
            in_progress,
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Project, ApiError> {
        let project: Option<Project> = sqlx::query_as("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        project.ok_or_else(|| ApiError::not_found("Project not found"))
    }

    async fn view_of(&self, project: Project) -> Result<ProjectView, ApiError> {
        let users =
            fetch_user_summaries(&self.pool, &related_user_ids(std::slice::from_ref(&project)))
                .await?;
        Ok(ProjectView::new(project, &users))
    }
}

/// Distinct creator and team member ids across a batch of projects
fn related_user_ids(projects: &[Project]) -> Vec<Uuid> {
    let mut ids: HashSet<Uuid> = HashSet::new();
    for project in projects {
        ids.insert(project.created_by);
        ids.extend(project.team_members.iter().copied());
    }
    ids.into_iter().collect()
}
