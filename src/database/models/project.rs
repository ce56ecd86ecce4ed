use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::models::task::TaskView;
use crate::database::models::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status")]
pub enum ProjectStatus {
    Planning,
    Active,
    #[serde(rename = "On Hold")]
    #[sqlx(rename = "On Hold")]
    OnHold,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_priority")]
pub enum ProjectPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub progress: i32,
    pub created_by: Uuid,
    pub team_members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task counts for one project, derived at read time and never persisted
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub in_progress: i64,
}

impl TaskStats {
    /// Share of completed tasks, rounded to whole percent; 0 for an empty project
    pub fn completion_percentage(&self) -> i64 {
        if self.total > 0 {
            ((self.completed as f64 / self.total as f64) * 100.0).round() as i64
        } else {
            0
        }
    }
}

/// Wire shape for `/api/projects/:id/stats`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatsView {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completion_percentage: i64,
}

impl From<TaskStats> for ProjectStatsView {
    fn from(stats: TaskStats) -> Self {
        Self {
            total_tasks: stats.total,
            completed_tasks: stats.completed,
            pending_tasks: stats.pending,
            in_progress_tasks: stats.in_progress,
            completion_percentage: stats.completion_percentage(),
        }
    }
}

/// Project as returned by the API: creator and team resolved to user
/// summaries, optionally enriched with stats and the full task list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget: f64,
    pub progress: i32,
    pub created_by: Option<UserSummary>,
    pub team_members: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_stats: Option<TaskStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskView>>,
}

impl ProjectView {
    /// Build the wire view from an entity plus pre-fetched user summaries
    pub fn new(
        project: Project,
        users: &std::collections::HashMap<Uuid, UserSummary>,
    ) -> Self {
        let created_by = users.get(&project.created_by).cloned();
        let team_members = project
            .team_members
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect();

        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            status: project.status,
            priority: project.priority,
            start_date: project.start_date,
            end_date: project.end_date,
            budget: project.budget,
            progress: project.progress,
            created_by,
            team_members,
            created_at: project.created_at,
            updated_at: project.updated_at,
            task_stats: None,
            tasks: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_strings_match_the_contract() {
        assert_eq!(
            serde_json::to_value(ProjectStatus::OnHold).unwrap(),
            "On Hold"
        );
        assert_eq!(
            serde_json::to_value(ProjectStatus::Planning).unwrap(),
            "Planning"
        );
        let parsed: ProjectStatus = serde_json::from_value("Cancelled".into()).unwrap();
        assert_eq!(parsed, ProjectStatus::Cancelled);
    }

    #[test]
    fn completion_percentage_rounds() {
        let stats = TaskStats {
            total: 3,
            completed: 1,
            pending: 1,
            in_progress: 1,
        };
        assert_eq!(stats.completion_percentage(), 33);

        let stats = TaskStats {
            total: 3,
            completed: 2,
            pending: 1,
            in_progress: 0,
        };
        assert_eq!(stats.completion_percentage(), 67);
    }

    #[test]
    fn completion_percentage_is_zero_for_empty_project() {
        assert_eq!(TaskStats::default().completion_percentage(), 0);
    }
}
