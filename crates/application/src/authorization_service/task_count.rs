use std::collections::HashMap;

use aclgate_domain::PrincipalContext;
use chrono::NaiveDate;

use super::*;

/// Role whose holders are the assignees of a cycle task.
pub const TASK_ASSIGNEES_ROLE: &str = "Task Assignees";

/// Workflow status of a cycle task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Assigned and not started.
    Assigned,
    /// Work in progress.
    InProgress,
    /// Work done by the assignee.
    Finished,
    /// Rejected by the verifier.
    Declined,
    /// Accepted by the verifier.
    Verified,
}

/// State of one task as seen by the workflow system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// Current status.
    pub status: TaskStatus,
    /// Last day the task is due.
    pub end_date: NaiveDate,
    /// Whether the task's cycle requires verification.
    pub verification_required: bool,
    /// Whether the task's cycle is the current one.
    pub cycle_is_current: bool,
}

impl TaskSnapshot {
    /// Returns whether the task still needs work in the current cycle.
    #[must_use]
    pub fn is_open(&self) -> bool {
        let terminal = if self.verification_required {
            TaskStatus::Verified
        } else {
            TaskStatus::Finished
        };

        self.cycle_is_current && self.status != terminal
    }

    /// Returns whether the task's end date has passed.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }
}

/// Open task summary shown to an assignee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCountSummary {
    /// Open tasks the principal is assigned to.
    pub open_task_count: usize,
    /// Whether any open task is overdue.
    pub has_overdue: bool,
}

impl AuthorizationService {
    /// Summarises the open tasks assigned to `principal_id`.
    ///
    /// Only the principal may query their own tasks. Assigned resources
    /// missing from `tasks` are not counted.
    pub async fn task_count(
        &self,
        actor: &PrincipalContext,
        principal_id: PrincipalId,
        tasks: &HashMap<ResourceRef, TaskSnapshot>,
        today: NaiveDate,
    ) -> AppResult<TaskCountSummary> {
        if actor.principal_id() != principal_id {
            return Err(AppError::Forbidden(format!(
                "principal '{}' cannot read task counts of '{principal_id}'",
                actor.principal()
            )));
        }

        let open_tasks = |resource: &ResourceRef| {
            tasks
                .get(resource)
                .filter(|snapshot| snapshot.is_open())
        };
        let is_overdue = |resource: &ResourceRef| {
            open_tasks(resource).is_some_and(|snapshot| snapshot.is_overdue(today))
        };

        let role_ids = self.role_ids_named(TASK_ASSIGNEES_ROLE)?;
        let classified = self
            .store
            .list_assignments_for_principal(principal_id, &role_ids, &is_overdue)
            .await?;

        let mut counts = OverdueCounts::default();
        for (resource, overdue) in classified {
            if open_tasks(&resource).is_some() {
                counts.record(overdue);
            }
        }

        Ok(TaskCountSummary {
            open_task_count: counts.total(),
            has_overdue: counts.overdue > 0,
        })
    }
}
