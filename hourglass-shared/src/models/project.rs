/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('planning', 'active', 'on-hold', 'completed', 'cancelled');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(200) NOT NULL,
///     description TEXT,
///     status project_status NOT NULL DEFAULT 'planning',
///     priority priority_level NOT NULL DEFAULT 'medium',
///     start_date DATE,
///     end_date DATE,
///     budget DOUBLE PRECISION,
///     manager_id UUID REFERENCES users(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a project cascades to its tasks and their timesheets.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{PageRequest, Priority};
use crate::access::{push_project_scope, RowScope};
use crate::error::FieldError;

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.status, p.priority, p.start_date, \
                               p.end_date, p.budget, p.manager_id, p.created_by, p.created_at, \
                               p.updated_at";

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on-hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

/// Project record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,

    /// Must reference an admin or manager
    pub manager_id: Option<Uuid>,

    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task counts per status for one project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub review: i64,
    pub done: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TaskStatsRow {
    project_id: Uuid,
    total: i64,
    todo: i64,
    in_progress: i64,
    review: i64,
    done: i64,
}

/// Project with computed task statistics, as returned by list endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithStats {
    #[serde(flatten)]
    pub project: Project,
    pub task_stats: TaskStats,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub manager_id: Option<Uuid>,
    pub created_by: Uuid,
}

/// Field changes for a project
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub budget: Option<Option<f64>>,
    pub manager_id: Option<Option<Uuid>>,
}

/// List filters for projects
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

/// Checks the record-level rules shared by create and update
pub fn validate_project_fields(
    name: &str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    budget: Option<f64>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name_len = name.trim().chars().count();
    if name_len == 0 || name_len > 200 {
        errors.push(FieldError::new("name", "Project name must be 1-200 characters"));
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            errors.push(FieldError::new("endDate", "End date must not be before start date"));
        }
    }
    if let Some(budget) = budget {
        if !budget.is_finite() || budget < 0.0 {
            errors.push(FieldError::new("budget", "Budget must be a non-negative number"));
        }
    }

    errors
}

impl Project {
    /// Applies field changes in memory
    pub fn apply(&mut self, changes: ProjectChanges) {
        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
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
        if let Some(start_date) = changes.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = changes.end_date {
            self.end_date = end_date;
        }
        if let Some(budget) = changes.budget {
            self.budget = budget;
        }
        if let Some(manager_id) = changes.manager_id {
            self.manager_id = manager_id;
        }
    }

    /// Validates the current field values
    pub fn validate(&self) -> Vec<FieldError> {
        validate_project_fields(&self.name, self.start_date, self.end_date, self.budget)
    }

    pub async fn create(pool: &PgPool, data: NewProject) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects AS p (name, description, status, priority, start_date, end_date, \
                                        budget, manager_id, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {PROJECT_COLUMNS}"
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(data.name.trim())
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.start_date)
            .bind(data.end_date)
            .bind(data.budget)
            .bind(data.manager_id)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = $1");

        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable column of `self` back to the database
    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        let query = format!(
            "UPDATE projects AS p SET name = $2, description = $3, status = $4, priority = $5, \
                start_date = $6, end_date = $7, budget = $8, manager_id = $9, updated_at = NOW() \
             WHERE p.id = $1 RETURNING {PROJECT_COLUMNS}"
        );

        sqlx::query_as::<_, Project>(&query)
            .bind(self.id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.status)
            .bind(self.priority)
            .bind(self.start_date)
            .bind(self.end_date)
            .bind(self.budget)
            .bind(self.manager_id)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists visible projects, newest first, with the total visible count
    pub async fn list(
        pool: &PgPool,
        filter: &ProjectFilter,
        scope: &RowScope,
        page: PageRequest,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM projects p WHERE TRUE");
        push_project_filters(&mut count, filter, scope);
        let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE TRUE"
        ));
        push_project_filters(&mut select, filter, scope);
        select
            .push(" ORDER BY p.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let projects = select.build_query_as::<Project>().fetch_all(pool).await?;

        Ok((projects, total))
    }

    /// Computes task statistics for the given projects
    ///
    /// Projects without tasks are absent from the map.
    pub async fn task_stats(
        pool: &PgPool,
        project_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, TaskStats>, sqlx::Error> {
        if project_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, TaskStatsRow>(
            r#"
            SELECT project_id,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'todo') AS todo,
                   COUNT(*) FILTER (WHERE status = 'in-progress') AS in_progress,
                   COUNT(*) FILTER (WHERE status = 'review') AS review,
                   COUNT(*) FILTER (WHERE status = 'done') AS done
            FROM tasks
            WHERE project_id = ANY($1)
            GROUP BY project_id
            "#,
        )
        .bind(project_ids)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.project_id,
                    TaskStats {
                        total: row.total,
                        todo: row.todo,
                        in_progress: row.in_progress,
                        review: row.review,
                        done: row.done,
                    },
                )
            })
            .collect())
    }

    /// Attaches task statistics to a page of projects
    pub async fn with_stats(
        pool: &PgPool,
        projects: Vec<Project>,
    ) -> Result<Vec<ProjectWithStats>, sqlx::Error> {
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let stats = Self::task_stats(pool, &ids).await?;

        Ok(projects
            .into_iter()
            .map(|project| ProjectWithStats {
                task_stats: stats.get(&project.id).copied().unwrap_or_default(),
                project,
            })
            .collect())
    }
}

fn push_project_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: &ProjectFilter,
    scope: &RowScope,
) {
    push_project_scope(qb, scope);

    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND p.priority = ").push_bind(priority);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
