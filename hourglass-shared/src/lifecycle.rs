/// Timesheet lifecycle validator
///
/// Every write to a time entry goes through this module. Validation runs to
/// completion before any statement is sent, and each write is a single-row
/// statement, so a rejected request never leaves a partial change behind.
///
/// # State Machine
///
/// ```text
/// draft ──► submitted ──► approved
///   ▲          │
///   └──────────┴────────► rejected
/// ```
///
/// - `draft`/`submitted` → `submitted`: owner or admin/manager
/// - `submitted` → `approved`/`rejected`: admin/manager
/// - `approved` → anything: admin only
/// - any other move: the owner while the entry is still `draft`
/// - admins may force any transition
///
/// Approval fields are always derived from the target status (see
/// [`status_fields`]), so the database CHECK constraints hold after every
/// write, including admin overrides.
///
/// # Example
///
/// ```no_run
/// use hourglass_shared::auth::actor::Actor;
/// use hourglass_shared::lifecycle::{create_entry, change_status, EntryInput};
/// use hourglass_shared::models::timesheet::TimesheetStatus;
/// use chrono::NaiveDate;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, employee: Actor, manager: Actor, task_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let entry = create_entry(&pool, &employee, EntryInput {
///     task_id,
///     project_id: None,
///     date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
///     hours: 8.0,
///     description: None,
///     billable: true,
/// }).await?;
///
/// change_status(&pool, &employee, entry.id, TimesheetStatus::Submitted, None).await?;
/// change_status(&pool, &manager, entry.id, TimesheetStatus::Approved, None).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::RowScope;
use crate::auth::actor::Actor;
use crate::auth::authorization::{can_approve, can_delete, can_edit, can_log_time, can_submit};
use crate::error::{DomainError, DomainResult};
use crate::models::task::Task;
use crate::models::timesheet::{NewTimesheet, Timesheet, TimesheetChanges, TimesheetStatus};

/// Upper bound for a single entry
pub const MAX_HOURS: f64 = 24.0;

/// Used when a rejection carries no reason
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

const UNIQUE_ENTRY_CONSTRAINT: &str = "timesheets_user_task_date_key";
const DUPLICATE_ENTRY_MESSAGE: &str = "Timesheet entry already exists for this task and date";

/// Input for a new time entry
///
/// `project_id` defaults to the task's project; when given it must match.
#[derive(Debug, Clone)]
pub struct EntryInput {
    pub task_id: Uuid,
    pub project_id: Option<Uuid>,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
    pub billable: bool,
}

/// Status and approval fields to write for a transition
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: TimesheetStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl StatusChange {
    pub fn apply_to(self, entry: &mut Timesheet) {
        entry.status = self.status;
        entry.approved_by = self.approved_by;
        entry.approved_at = self.approved_at;
        entry.rejection_reason = self.rejection_reason;
    }
}

/// Rounds to two decimal places
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Checks hours ∈ (0, 24] and returns the rounded value
pub fn validate_hours(hours: f64) -> DomainResult<f64> {
    if !hours.is_finite() {
        return Err(DomainError::field("hours", "Hours must be a number"));
    }

    if hours > MAX_HOURS {
        return Err(DomainError::field("hours", "Hours cannot exceed 24"));
    }

    let rounded = round_hours(hours);
    if hours <= 0.0 || rounded <= 0.0 {
        return Err(DomainError::field("hours", "Hours must be greater than 0"));
    }

    Ok(rounded)
}

/// Approval fields implied by a target status
pub fn status_fields(
    target: TimesheetStatus,
    actor: &Actor,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> StatusChange {
    match target {
        TimesheetStatus::Approved => StatusChange {
            status: target,
            approved_by: Some(actor.id),
            approved_at: Some(now),
            rejection_reason: None,
        },
        TimesheetStatus::Rejected => StatusChange {
            status: target,
            approved_by: None,
            approved_at: None,
            rejection_reason: Some(
                reason
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_REJECTION_REASON)
                    .to_string(),
            ),
        },
        TimesheetStatus::Draft | TimesheetStatus::Submitted => StatusChange {
            status: target,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
        },
    }
}

/// Decides whether `actor` may move `entry` to `target`
pub fn check_transition(
    actor: &Actor,
    entry: &Timesheet,
    target: TimesheetStatus,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> DomainResult<StatusChange> {
    let from = entry.status;

    if actor.is_admin() {
        return Ok(status_fields(target, actor, reason, now));
    }

    if from == TimesheetStatus::Approved {
        return Err(DomainError::Forbidden(
            "Approved timesheets can only be changed by an admin".to_string(),
        ));
    }

    match target {
        TimesheetStatus::Submitted if can_submit(actor, entry) => {}
        TimesheetStatus::Approved | TimesheetStatus::Rejected => {
            if !actor.is_privileged() {
                return Err(DomainError::Forbidden(format!(
                    "Only managers and admins can mark timesheets as {target}"
                )));
            }
            if !can_approve(actor, entry) {
                return Err(DomainError::field(
                    "status",
                    format!("Only submitted timesheets can be {target}"),
                ));
            }
        }
        _ => {
            if !(actor.is(entry.user_id) && from == TimesheetStatus::Draft) {
                return Err(DomainError::Forbidden(format!(
                    "Not allowed to change timesheet status from {from} to {target}"
                )));
            }
        }
    }

    Ok(status_fields(target, actor, reason, now))
}

/// Maps the storage-level uniqueness violation onto a conflict
fn map_write_error(err: sqlx::Error) -> DomainError {
    let is_duplicate = err
        .as_database_error()
        .and_then(|db| db.constraint())
        .is_some_and(|c| c == UNIQUE_ENTRY_CONSTRAINT);

    if is_duplicate {
        DomainError::Conflict(DUPLICATE_ENTRY_MESSAGE.to_string())
    } else {
        DomainError::Database(err)
    }
}

async fn load_task(pool: &PgPool, task_id: Uuid) -> DomainResult<Task> {
    Task::find_by_id(pool, task_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Task not found".to_string()))
}

async fn load_entry(pool: &PgPool, id: Uuid) -> DomainResult<Timesheet> {
    Timesheet::find_by_id(pool, id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Timesheet not found".to_string()))
}

/// Resolves the entry's project from its task, rejecting a mismatch
fn resolve_project(task: &Task, requested: Option<Uuid>) -> DomainResult<Uuid> {
    match requested {
        Some(project_id) if project_id != task.project_id => Err(DomainError::field(
            "projectId",
            "Task does not belong to the specified project",
        )),
        _ => Ok(task.project_id),
    }
}

/// Loads an entry the actor is allowed to see
pub async fn find_visible(pool: &PgPool, actor: &Actor, id: Uuid) -> DomainResult<Timesheet> {
    let entry = load_entry(pool, id).await?;

    if !RowScope::for_actor(actor).allows_timesheet(&entry) {
        return Err(DomainError::Forbidden(
            "Not allowed to access this timesheet".to_string(),
        ));
    }

    Ok(entry)
}

/// Creates a draft entry owned by the actor
pub async fn create_entry(
    pool: &PgPool,
    actor: &Actor,
    input: EntryInput,
) -> DomainResult<Timesheet> {
    let hours = validate_hours(input.hours)?;
    let task = load_task(pool, input.task_id).await?;

    if !can_log_time(actor, &task) {
        warn!(user_id = %actor.id, task_id = %task.id, "Time logging denied");
        return Err(DomainError::Forbidden(
            "You can only log time on tasks assigned to you".to_string(),
        ));
    }

    let project_id = resolve_project(&task, input.project_id)?;

    if Timesheet::exists_for(pool, actor.id, task.id, input.date, None).await? {
        return Err(DomainError::Conflict(DUPLICATE_ENTRY_MESSAGE.to_string()));
    }

    let entry = Timesheet::insert(
        pool,
        NewTimesheet {
            user_id: actor.id,
            task_id: task.id,
            project_id,
            date: input.date,
            hours,
            description: input.description,
            billable: input.billable,
        },
    )
    .await
    .map_err(map_write_error)?;

    info!(timesheet_id = %entry.id, user_id = %actor.id, hours, "Timesheet entry created");
    Ok(entry)
}

/// Applies field edits, re-running every entry invariant
pub async fn update_entry(
    pool: &PgPool,
    actor: &Actor,
    id: Uuid,
    changes: TimesheetChanges,
) -> DomainResult<Timesheet> {
    let mut entry = find_visible(pool, actor, id).await?;

    if !can_edit(actor, &entry) {
        return Err(DomainError::Forbidden(format!(
            "Not allowed to edit a {} timesheet",
            entry.status
        )));
    }

    let task_changed = changes.task_id.is_some_and(|t| t != entry.task_id);
    let project_requested = changes.project_id;
    let key_changed = task_changed || changes.date.is_some_and(|d| d != entry.date);
    entry.apply(changes);
    entry.hours = validate_hours(entry.hours)?;

    if task_changed || project_requested.is_some() {
        let task = load_task(pool, entry.task_id).await?;
        if task_changed && !can_log_time(actor, &task) {
            return Err(DomainError::Forbidden(
                "You can only log time on tasks assigned to you".to_string(),
            ));
        }
        entry.project_id = resolve_project(&task, project_requested)?;
    }

    if key_changed
        && Timesheet::exists_for(pool, entry.user_id, entry.task_id, entry.date, Some(entry.id))
            .await?
    {
        return Err(DomainError::Conflict(DUPLICATE_ENTRY_MESSAGE.to_string()));
    }

    let saved = entry.save(pool).await.map_err(map_write_error)?;
    info!(timesheet_id = %saved.id, user_id = %actor.id, "Timesheet entry updated");
    Ok(saved)
}

/// Moves an entry to `target`, deriving the approval fields
pub async fn change_status(
    pool: &PgPool,
    actor: &Actor,
    id: Uuid,
    target: TimesheetStatus,
    reason: Option<&str>,
) -> DomainResult<Timesheet> {
    let mut entry = load_entry(pool, id).await?;
    let from = entry.status;

    let change = check_transition(actor, &entry, target, reason, Utc::now()).inspect_err(|_| {
        warn!(
            timesheet_id = %id,
            user_id = %actor.id,
            from = %from,
            to = %target,
            "Status transition denied"
        );
    })?;
    change.apply_to(&mut entry);

    let saved = entry.save(pool).await?;
    info!(
        timesheet_id = %saved.id,
        user_id = %actor.id,
        from = %from,
        to = %target,
        "Timesheet status changed"
    );
    Ok(saved)
}

/// Deletes an entry
pub async fn delete_entry(pool: &PgPool, actor: &Actor, id: Uuid) -> DomainResult<()> {
    let entry = load_entry(pool, id).await?;

    if !can_delete(actor, &entry) {
        return Err(DomainError::Forbidden(
            "Only draft timesheets can be deleted by their owner".to_string(),
        ));
    }

    Timesheet::delete(pool, entry.id).await?;
    info!(timesheet_id = %entry.id, user_id = %actor.id, "Timesheet entry deleted");
    Ok(())
}
