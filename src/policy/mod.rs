//! Role-based access rules.
//!
//! Every authorization decision in the API goes through this module: an
//! exhaustive match over the closed [`Role`] enum, never a string compare
//! in a handler. The [`Principal`] is resolved once per request by the
//! auth middleware and passed down the call chain explicitly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{project::Project, task::Task};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

/// The authenticated actor making a request
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Admins may manage projects, tasks, the user directory, and full exports
pub fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    match principal.role {
        Role::Admin => Ok(()),
        Role::Member => Err(ApiError::forbidden("Access denied, admin only")),
    }
}

/// Members may read a project only when listed in its team
pub fn can_view_project(principal: &Principal, project: &Project) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Member => project.team_members.contains(&principal.id),
    }
}

pub fn ensure_project_access(principal: &Principal, project: &Project) -> Result<(), ApiError> {
    if can_view_project(principal, project) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized to access this project"))
    }
}

/// Members may read a task when assigned to it or when they created it
pub fn can_view_task(principal: &Principal, task: &Task) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Member => {
            task.assigned_to.contains(&principal.id) || task.created_by == principal.id
        }
    }
}

pub fn ensure_task_access(principal: &Principal, task: &Task) -> Result<(), ApiError> {
    if can_view_task(principal, task) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized to access this task"))
    }
}

/// Members may change a task's status or checklist only when assigned
pub fn can_update_task_progress(principal: &Principal, task: &Task) -> bool {
    match principal.role {
        Role::Admin => true,
        Role::Member => task.assigned_to.contains(&principal.id),
    }
}

pub fn ensure_task_progress_access(principal: &Principal, task: &Task) -> Result<(), ApiError> {
    if can_update_task_progress(principal, task) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not authorized to update this task"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::project::{ProjectPriority, ProjectStatus};
    use crate::database::models::task::TaskStatus;
    use chrono::{NaiveDate, Utc};
    use sqlx::types::Json;

    fn admin() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Root".into(),
            email: "root@example.com".into(),
            role: Role::Admin,
        }
    }

    fn member() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Mel".into(),
            email: "mel@example.com".into(),
            role: Role::Member,
        }
    }

    fn project_with_team(team: Vec<Uuid>) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "P".into(),
            description: "d".into(),
            status: ProjectStatus::Planning,
            priority: ProjectPriority::Medium,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            budget: 0.0,
            progress: 0,
            created_by: Uuid::new_v4(),
            team_members: team,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task_with(assigned: Vec<Uuid>, created_by: Uuid) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "T".into(),
            description: String::new(),
            status: TaskStatus::Pending,
            due_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            project_id: None,
            assigned_to: assigned,
            created_by,
            todo_checklist: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_passes_everything() {
        let p = admin();
        let project = project_with_team(vec![]);
        let task = task_with(vec![], Uuid::new_v4());
        assert!(require_admin(&p).is_ok());
        assert!(can_view_project(&p, &project));
        assert!(can_view_task(&p, &task));
        assert!(can_update_task_progress(&p, &task));
    }

    #[test]
    fn member_is_not_admin() {
        let err = require_admin(&member()).unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn member_sees_project_only_when_on_team() {
        let p = member();
        assert!(!can_view_project(&p, &project_with_team(vec![])));
        assert!(can_view_project(&p, &project_with_team(vec![p.id])));
    }

    #[test]
    fn member_sees_task_when_assigned_or_creator() {
        let p = member();
        assert!(!can_view_task(&p, &task_with(vec![], Uuid::new_v4())));
        assert!(can_view_task(&p, &task_with(vec![p.id], Uuid::new_v4())));
        assert!(can_view_task(&p, &task_with(vec![], p.id)));
    }

    #[test]
    fn creator_alone_cannot_update_progress() {
        let p = member();
        let own = task_with(vec![], p.id);
        assert!(!can_update_task_progress(&p, &own));
        let assigned = task_with(vec![p.id], Uuid::new_v4());
        assert!(can_update_task_progress(&p, &assigned));
    }
}
