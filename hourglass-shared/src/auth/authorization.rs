/// Capability checks
///
/// One function per action. Each takes the explicit [`Actor`] and the record
/// being acted on and returns a plain `bool`, so handlers and the lifecycle
/// validator share one source of truth and the rules are testable without
/// HTTP or a database.
///
/// # Permission Model
///
/// | Action                    | Admin | Manager               | Employee                  |
/// |---------------------------|-------|-----------------------|---------------------------|
/// | Log time on a task        | yes   | yes                   | if assigned to the task   |
/// | Edit a time entry         | yes   | if not approved       | own, while draft          |
/// | Submit a time entry       | yes   | yes                   | own, draft or submitted   |
/// | Approve / reject          | yes   | submitted entries     | no                        |
/// | Delete a time entry       | yes   | yes                   | own, while draft          |
/// | Create a project          | yes   | yes                   | no                        |
/// | Update a project          | yes   | managed or created    | no                        |
/// | Delete a project          | yes   | no                    | no                        |
/// | Create / delete a task    | yes   | yes                   | no                        |
/// | Update a task             | yes   | yes                   | status/actual hours, own  |
/// | View a user               | yes   | yes                   | self                      |
/// | Delete a user             | others| no                    | no                        |
///
/// # Example
///
/// ```
/// use hourglass_shared::auth::actor::Actor;
/// use hourglass_shared::auth::authorization::can_delete_project;
/// use hourglass_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// assert!(can_delete_project(&Actor::new(Uuid::new_v4(), UserRole::Admin)));
/// assert!(!can_delete_project(&Actor::new(Uuid::new_v4(), UserRole::Manager)));
/// ```

use uuid::Uuid;

use super::actor::Actor;
use crate::models::project::Project;
use crate::models::task::{Task, TaskChanges};
use crate::models::timesheet::{Timesheet, TimesheetStatus};

/// Admin/manager, or the task's assignee
pub fn can_log_time(actor: &Actor, task: &Task) -> bool {
    actor.is_privileged() || task.assigned_to == Some(actor.id)
}

/// Field edits (date, hours, task, description, billable)
pub fn can_edit(actor: &Actor, entry: &Timesheet) -> bool {
    if actor.is_admin() {
        return true;
    }
    if actor.is_privileged() {
        return entry.status != TimesheetStatus::Approved;
    }
    actor.is(entry.user_id) && entry.status == TimesheetStatus::Draft
}

/// Moving an entry into `submitted`
pub fn can_submit(actor: &Actor, entry: &Timesheet) -> bool {
    matches!(
        entry.status,
        TimesheetStatus::Draft | TimesheetStatus::Submitted
    ) && (actor.is(entry.user_id) || actor.is_privileged())
}

/// Approving or rejecting an entry
pub fn can_approve(actor: &Actor, entry: &Timesheet) -> bool {
    actor.is_privileged() && entry.status == TimesheetStatus::Submitted
}

pub fn can_delete(actor: &Actor, entry: &Timesheet) -> bool {
    actor.is_privileged() || (actor.is(entry.user_id) && entry.status == TimesheetStatus::Draft)
}

pub fn can_create_project(actor: &Actor) -> bool {
    actor.is_privileged()
}

pub fn can_update_project(actor: &Actor, project: &Project) -> bool {
    actor.is_admin()
        || (actor.is_privileged()
            && (project.manager_id == Some(actor.id) || project.created_by == actor.id))
}

pub fn can_delete_project(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Creating or deleting tasks
pub fn can_manage_tasks(actor: &Actor) -> bool {
    actor.is_privileged()
}

/// Admin/manager may change anything; the assignee only status and actual hours
pub fn can_update_task(actor: &Actor, task: &Task, changes: &TaskChanges) -> bool {
    actor.is_privileged() || (task.assigned_to == Some(actor.id) && changes.is_progress_only())
}

pub fn can_view_user(actor: &Actor, user_id: Uuid) -> bool {
    actor.is_privileged() || actor.is(user_id)
}

pub fn can_list_users(actor: &Actor) -> bool {
    actor.is_privileged()
}

/// Admin only, never their own account
pub fn can_delete_user(actor: &Actor, user_id: Uuid) -> bool {
    actor.is_admin() && !actor.is(user_id)
}
