use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::models::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "In-Progress")]
    #[sqlx(rename = "In-Progress")]
    InProgress,
    Completed,
}

/// One entry of a task's ordered checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub text: String,
    pub done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: NaiveDate,
    pub project_id: Option<Uuid>,
    pub assigned_to: Vec<Uuid>,
    pub created_by: Uuid,
    pub todo_checklist: Json<Vec<ChecklistItem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn completed_todo_count(&self) -> usize {
        self.todo_checklist.iter().filter(|item| item.done).count()
    }
}

/// Task as returned by the API: assignees and creator resolved to user
/// summaries at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Uuid>,
    pub assigned_to: Vec<UserSummary>,
    pub created_by: Option<UserSummary>,
    pub todo_checklist: Vec<ChecklistItem>,
    pub completed_todo_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    /// Build the wire view from an entity plus pre-fetched user summaries
    pub fn new(task: Task, users: &std::collections::HashMap<Uuid, UserSummary>) -> Self {
        let completed_todo_count = task.completed_todo_count();
        let assigned_to = task
            .assigned_to
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect();
        let created_by = users.get(&task.created_by).cloned();

        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            due_date: task.due_date,
            project: task.project_id,
            assigned_to,
            created_by,
            todo_checklist: task.todo_checklist.0,
            completed_todo_count,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
