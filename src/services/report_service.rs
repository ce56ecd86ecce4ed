use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::task::Task;
use crate::error::ApiError;
use crate::policy::{self, Principal};
use crate::services::user_service::fetch_user_summaries;

/// One exported line: task fields flattened to display strings
#[derive(Debug, Clone)]
pub struct TaskReportRow {
    pub title: String,
    pub description: String,
    pub project: String,
    pub status: String,
    pub due_date: String,
    pub assigned_to: String,
    pub checklist: String,
}

const REPORT_HEADER: [&str; 7] = [
    "Title",
    "Description",
    "Project",
    "Status",
    "Due Date",
    "Assigned To",
    "Checklist Done",
];

/// Render rows to CSV, header first
fn write_csv(rows: &[TaskReportRow]) -> Result<String, ApiError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(REPORT_HEADER)
        .map_err(|e| ApiError::server_error(e.to_string()))?;

    for row in rows {
        writer
            .write_record([
                &row.title,
                &row.description,
                &row.project,
                &row.status,
                &row.due_date,
                &row.assigned_to,
                &row.checklist,
            ])
            .map_err(|e| ApiError::server_error(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::server_error(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ApiError::server_error(e.to_string()))
}

pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Full task export, admin only
    pub async fn export_tasks(&self, principal: &Principal) -> Result<String, ApiError> {
        policy::require_admin(principal)?;
        let rows = self.rows(None).await?;
        write_csv(&rows)
    }

    /// The caller's own assigned tasks
    pub async fn export_user_tasks(&self, principal: &Principal) -> Result<String, ApiError> {
        let rows = self.rows(Some(principal.id)).await?;
        write_csv(&rows)
    }

    async fn rows(&self, assignee: Option<Uuid>) -> Result<Vec<TaskReportRow>, ApiError> {
        let tasks: Vec<Task> = match assignee {
            Some(user_id) => {
                sqlx::query_as(
                    "SELECT * FROM tasks WHERE $1 = ANY(assigned_to) ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM tasks ORDER BY created_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut user_ids: Vec<Uuid> = tasks.iter().flat_map(|t| t.assigned_to.clone()).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = fetch_user_summaries(&self.pool, &user_ids).await?;

        let mut project_ids: Vec<Uuid> = tasks.iter().filter_map(|t| t.project_id).collect();
        project_ids.sort_unstable();
        project_ids.dedup();
        let projects = self.project_names(&project_ids).await?;

        Ok(tasks
            .into_iter()
            .map(|task| {
                let assigned_to = task
                    .assigned_to
                    .iter()
                    .filter_map(|id| users.get(id).map(|u| u.name.clone()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let project = task
                    .project_id
                    .and_then(|id| projects.get(&id).cloned())
                    .unwrap_or_default();
                let status = serde_json::to_value(task.status)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default();
                let checklist = format!(
                    "{}/{}",
                    task.completed_todo_count(),
                    task.todo_checklist.len()
                );

                TaskReportRow {
                    title: task.title,
                    description: task.description,
                    project,
                    status,
                    due_date: task.due_date.to_string(),
                    assigned_to,
                    checklist,
                }
            })
            .collect())
    }

    async fn project_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, name FROM projects WHERE id = ANY($1)")
                .bind(ids.to_vec())
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}
