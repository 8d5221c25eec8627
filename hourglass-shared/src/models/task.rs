/// Task model and database operations
///
/// A task belongs to exactly one project and is optionally assigned to one
/// active user. `completed_at` tracks the `done` status:
///
/// ```text
/// todo ⇄ in-progress ⇄ review ⇄ done    (completed_at set only while done)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'review', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority priority_level NOT NULL DEFAULT 'medium',
///     assigned_to UUID REFERENCES users(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     estimated_hours DOUBLE PRECISION,
///     actual_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
///     due_date DATE,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use hourglass_shared::models::task::{NewTask, Task};
/// use hourglass_shared::models::Priority;
/// use hourglass_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, NewTask {
///     project_id: Uuid::new_v4(),
///     title: "Write copy".to_string(),
///     description: None,
///     status: Default::default(),
///     priority: Priority::High,
///     assigned_to: None,
///     created_by: Uuid::new_v4(),
///     estimated_hours: Some(6.0),
///     due_date: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{PageRequest, Priority, ProjectSummary, UserSummary};
use crate::access::{push_task_scope, RowScope};
use crate::error::{DomainError, DomainResult, FieldError};
use crate::models::user::User;

const TASK_COLUMNS: &str = "k.id, k.project_id, k.title, k.description, k.status, k.priority, \
                            k.assigned_to, k.created_by, k.estimated_hours, k.actual_hours, \
                            k.due_date, k.completed_at, k.created_at, k.updated_at";

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }
}

/// Task record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub due_date: Option<NaiveDate>,

    /// Set iff status is `done`
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task with its project and assignee, as returned by list and detail endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub project: Option<ProjectSummary>,
    pub assignee: Option<UserSummary>,
}

#[derive(Debug, sqlx::FromRow)]
struct TaskDetailRow {
    #[sqlx(flatten)]
    task: Task,
    project_name: Option<String>,
    assignee_first_name: Option<String>,
    assignee_last_name: Option<String>,
    assignee_email: Option<String>,
}

impl From<TaskDetailRow> for TaskDetail {
    fn from(row: TaskDetailRow) -> Self {
        let project = row.project_name.map(|name| ProjectSummary {
            id: row.task.project_id,
            name,
        });
        let assignee = match (
            row.task.assigned_to,
            row.assignee_first_name,
            row.assignee_last_name,
            row.assignee_email,
        ) {
            (Some(id), Some(first_name), Some(last_name), Some(email)) => Some(UserSummary {
                id,
                first_name,
                last_name,
                email,
            }),
            _ => None,
        };

        TaskDetail {
            task: row.task,
            project,
            assignee,
        }
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
    pub estimated_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

/// Field changes for a task
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Option<Uuid>>,
    pub estimated_hours: Option<Option<f64>>,
    pub actual_hours: Option<f64>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskChanges {
    /// True when only `status` and/or `actual_hours` are touched
    ///
    /// These are the fields an assignee may change on their own task.
    pub fn is_progress_only(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.estimated_hours.is_none()
            && self.due_date.is_none()
    }
}

/// List filters for tasks
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    /// Case-insensitive match on title or description
    pub search: Option<String>,
}

/// Checks the record-level rules shared by create and update
pub fn validate_task_fields(
    title: &str,
    estimated_hours: Option<f64>,
    actual_hours: f64,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let title_len = title.trim().chars().count();
    if title_len == 0 || title_len > 200 {
        errors.push(FieldError::new("title", "Task title must be 1-200 characters"));
    }
    if let Some(estimated) = estimated_hours {
        if !estimated.is_finite() || estimated < 0.0 {
            errors.push(FieldError::new(
                "estimatedHours",
                "Estimated hours must be a non-negative number",
            ));
        }
    }
    if !actual_hours.is_finite() || actual_hours < 0.0 {
        errors.push(FieldError::new(
            "actualHours",
            "Actual hours must be a non-negative number",
        ));
    }

    errors
}

/// Ensures `user_id` names an active user
pub async fn ensure_assignable(pool: &PgPool, user_id: Uuid) -> DomainResult<User> {
    match User::find_by_id(pool, user_id).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(DomainError::field(
            "assignedTo",
            "Assigned user is not active",
        )),
        None => Err(DomainError::field("assignedTo", "Assigned user not found")),
    }
}

/// Completion timestamp for a task moving into `status`
fn completion_for(
    status: TaskStatus,
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match status {
        TaskStatus::Done => Some(current.unwrap_or(now)),
        _ => None,
    }
}

impl Task {
    /// Applies field changes in memory and keeps `completed_at` in step with status
    pub fn apply(&mut self, changes: TaskChanges, now: DateTime<Utc>) {
        if let Some(title) = changes.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(assigned_to) = changes.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(estimated_hours) = changes.estimated_hours {
            self.estimated_hours = estimated_hours;
        }
        if let Some(actual_hours) = changes.actual_hours {
            self.actual_hours = actual_hours;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }

        self.completed_at = completion_for(self.status, self.completed_at, now);
    }

    pub fn validate(&self) -> Vec<FieldError> {
        validate_task_fields(&self.title, self.estimated_hours, self.actual_hours)
    }

    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let completed_at = completion_for(data.status, None, Utc::now());
        let query = format!(
            "INSERT INTO tasks AS k (project_id, title, description, status, priority, assigned_to, \
                                     created_by, estimated_hours, due_date, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.project_id)
            .bind(data.title.trim())
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.assigned_to)
            .bind(data.created_by)
            .bind(data.estimated_hours)
            .bind(data.due_date)
            .bind(completed_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks k WHERE k.id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Loads a task together with its project and assignee summaries
    pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<TaskDetail>, sqlx::Error> {
        let mut qb = detail_select();
        qb.push(" WHERE k.id = ").push_bind(id);

        let row = qb.build_query_as::<TaskDetailRow>().fetch_optional(pool).await?;
        Ok(row.map(TaskDetail::from))
    }

    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        let query = format!(
            "UPDATE tasks AS k SET title = $2, description = $3, status = $4, priority = $5, \
                assigned_to = $6, estimated_hours = $7, actual_hours = $8, due_date = $9, \
                completed_at = $10, updated_at = NOW() \
             WHERE k.id = $1 RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(self.id)
            .bind(&self.title)
            .bind(&self.description)
            .bind(self.status)
            .bind(self.priority)
            .bind(self.assigned_to)
            .bind(self.estimated_hours)
            .bind(self.actual_hours)
            .bind(self.due_date)
            .bind(self.completed_at)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists visible tasks, most urgent due date first, with the total visible count
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        scope: &RowScope,
        page: PageRequest,
    ) -> Result<(Vec<TaskDetail>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks k WHERE TRUE");
        push_task_filters(&mut count, filter, scope);
        let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut select = detail_select();
        select.push(" WHERE TRUE");
        push_task_filters(&mut select, filter, scope);
        select
            .push(" ORDER BY k.due_date ASC NULLS LAST, k.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select.build_query_as::<TaskDetailRow>().fetch_all(pool).await?;

        Ok((rows.into_iter().map(TaskDetail::from).collect(), total))
    }
}

fn detail_select() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {TASK_COLUMNS}, p.name AS project_name, \
                a.first_name AS assignee_first_name, a.last_name AS assignee_last_name, \
                a.email AS assignee_email \
         FROM tasks k \
         LEFT JOIN projects p ON p.id = k.project_id \
         LEFT JOIN users a ON a.id = k.assigned_to"
    ))
}

fn push_task_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter, scope: &RowScope) {
    push_task_scope(qb, scope);

    if let Some(project_id) = filter.project_id {
        qb.push(" AND k.project_id = ").push_bind(project_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND k.status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND k.priority = ").push_bind(priority);
    }
    if let Some(assigned_to) = filter.assigned_to {
        qb.push(" AND k.assigned_to = ").push_bind(assigned_to);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (k.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR k.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
