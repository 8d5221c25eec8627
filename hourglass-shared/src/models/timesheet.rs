/// Timesheet model and database operations
///
/// One row per (user, task, date). The approval fields are tied to status by
/// CHECK constraints:
///
/// - `approved_by`/`approved_at` are non-null iff status is `approved`
/// - `rejection_reason` is non-null iff status is `rejected`
///
/// Status changes go through [`crate::lifecycle`], which derives those fields
/// from the target status before calling [`Timesheet::save`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE timesheet_status AS ENUM ('draft', 'submitted', 'approved', 'rejected');
///
/// CREATE TABLE timesheets (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id),
///     task_id UUID NOT NULL,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     date DATE NOT NULL,
///     hours DOUBLE PRECISION NOT NULL,          -- (0, 24]
///     description TEXT,
///     billable BOOLEAN NOT NULL DEFAULT TRUE,
///     status timesheet_status NOT NULL DEFAULT 'draft',
///     approved_by UUID REFERENCES users(id),
///     approved_at TIMESTAMPTZ,
///     rejection_reason TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     FOREIGN KEY (task_id, project_id) REFERENCES tasks(id, project_id) ON DELETE CASCADE,
///     UNIQUE (user_id, task_id, date)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{PageRequest, ProjectSummary, TaskSummary, UserSummary};
use crate::access::{push_timesheet_scope, RowScope};

const TIMESHEET_COLUMNS: &str = "t.id, t.user_id, t.task_id, t.project_id, t.date, t.hours, \
                                 t.description, t.billable, t.status, t.approved_by, \
                                 t.approved_at, t.rejection_reason, t.created_at, t.updated_at";

/// Approval state of a time entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "timesheet_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimesheetStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl TimesheetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimesheetStatus::Draft => "draft",
            TimesheetStatus::Submitted => "submitted",
            TimesheetStatus::Approved => "approved",
            TimesheetStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TimesheetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Timesheet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
    pub billable: bool,
    pub status: TimesheetStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Time entry with the user, project and task it references
///
/// The relations are `LEFT JOIN`ed, so a dangling reference shows up as
/// `None` instead of silently dropping the row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetDetail {
    #[serde(flatten)]
    pub timesheet: Timesheet,
    pub user: Option<UserSummary>,
    pub project: Option<ProjectSummary>,
    pub task: Option<TaskSummary>,
}

#[derive(Debug, sqlx::FromRow)]
struct TimesheetDetailRow {
    #[sqlx(flatten)]
    timesheet: Timesheet,
    user_first_name: Option<String>,
    user_last_name: Option<String>,
    user_email: Option<String>,
    project_name: Option<String>,
    task_title: Option<String>,
}

impl From<TimesheetDetailRow> for TimesheetDetail {
    fn from(row: TimesheetDetailRow) -> Self {
        let user = match (row.user_first_name, row.user_last_name, row.user_email) {
            (Some(first_name), Some(last_name), Some(email)) => Some(UserSummary {
                id: row.timesheet.user_id,
                first_name,
                last_name,
                email,
            }),
            _ => None,
        };
        let project = row.project_name.map(|name| ProjectSummary {
            id: row.timesheet.project_id,
            name,
        });
        let task = row.task_title.map(|title| TaskSummary {
            id: row.timesheet.task_id,
            title,
        });

        TimesheetDetail {
            timesheet: row.timesheet,
            user,
            project,
            task,
        }
    }
}

/// Input for inserting a time entry; status always starts as `draft`
#[derive(Debug, Clone)]
pub struct NewTimesheet {
    pub user_id: Uuid,
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
    pub billable: bool,
}

/// Field edits for a time entry (status is changed separately)
#[derive(Debug, Clone, Default)]
pub struct TimesheetChanges {
    pub task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub hours: Option<f64>,
    pub description: Option<Option<String>>,
    pub billable: Option<bool>,
}

impl TimesheetChanges {
    pub fn is_empty(&self) -> bool {
        self.task_id.is_none()
            && self.project_id.is_none()
            && self.date.is_none()
            && self.hours.is_none()
            && self.description.is_none()
            && self.billable.is_none()
    }
}

/// List and report filters for time entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimesheetFilter {
    /// Inclusive lower bound on `date`
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound on `date`
    pub end_date: Option<NaiveDate>,

    pub status: Option<TimesheetStatus>,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl Timesheet {
    /// Applies field edits in memory
    pub fn apply(&mut self, changes: TimesheetChanges) {
        if let Some(task_id) = changes.task_id {
            self.task_id = task_id;
        }
        if let Some(project_id) = changes.project_id {
            self.project_id = project_id;
        }
        if let Some(date) = changes.date {
            self.date = date;
        }
        if let Some(hours) = changes.hours {
            self.hours = hours;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(billable) = changes.billable {
            self.billable = billable;
        }
    }

    pub async fn insert(pool: &PgPool, data: NewTimesheet) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO timesheets AS t (user_id, task_id, project_id, date, hours, description, \
                                          billable, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft') RETURNING {TIMESHEET_COLUMNS}"
        );

        sqlx::query_as::<_, Timesheet>(&query)
            .bind(data.user_id)
            .bind(data.task_id)
            .bind(data.project_id)
            .bind(data.date)
            .bind(data.hours)
            .bind(data.description)
            .bind(data.billable)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TIMESHEET_COLUMNS} FROM timesheets t WHERE t.id = $1");

        sqlx::query_as::<_, Timesheet>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_detail(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<TimesheetDetail>, sqlx::Error> {
        let mut qb = detail_select();
        qb.push(" WHERE t.id = ").push_bind(id);

        let row = qb
            .build_query_as::<TimesheetDetailRow>()
            .fetch_optional(pool)
            .await?;
        Ok(row.map(TimesheetDetail::from))
    }

    /// Checks whether an entry exists for (user, task, date), optionally ignoring one row
    pub async fn exists_for(
        pool: &PgPool,
        user_id: Uuid,
        task_id: Uuid,
        date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM timesheets
                WHERE user_id = $1 AND task_id = $2 AND date = $3
                  AND ($4::uuid IS NULL OR id <> $4)
            )
            "#,
        )
        .bind(user_id)
        .bind(task_id)
        .bind(date)
        .bind(exclude)
        .fetch_one(pool)
        .await
    }

    /// Writes every mutable column, including status and approval fields
    pub async fn save(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        let query = format!(
            "UPDATE timesheets AS t SET task_id = $2, project_id = $3, date = $4, hours = $5, \
                description = $6, billable = $7, status = $8, approved_by = $9, \
                approved_at = $10, rejection_reason = $11, updated_at = NOW() \
             WHERE t.id = $1 RETURNING {TIMESHEET_COLUMNS}"
        );

        sqlx::query_as::<_, Timesheet>(&query)
            .bind(self.id)
            .bind(self.task_id)
            .bind(self.project_id)
            .bind(self.date)
            .bind(self.hours)
            .bind(&self.description)
            .bind(self.billable)
            .bind(self.status)
            .bind(self.approved_by)
            .bind(self.approved_at)
            .bind(&self.rejection_reason)
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM timesheets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists visible entries, newest date first, with the total visible count
    pub async fn list(
        pool: &PgPool,
        filter: &TimesheetFilter,
        scope: &RowScope,
        page: PageRequest,
    ) -> Result<(Vec<TimesheetDetail>, i64), sqlx::Error> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM timesheets t WHERE TRUE");
        push_timesheet_filters(&mut count, filter, scope);
        let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut select = detail_select();
        select.push(" WHERE TRUE");
        push_timesheet_filters(&mut select, filter, scope);
        select
            .push(" ORDER BY t.date DESC, t.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = select
            .build_query_as::<TimesheetDetailRow>()
            .fetch_all(pool)
            .await?;

        Ok((rows.into_iter().map(TimesheetDetail::from).collect(), total))
    }

    /// Loads every visible entry matching the filter, oldest date first
    ///
    /// Used by summaries and reports, which aggregate the whole set.
    pub async fn list_all(
        pool: &PgPool,
        filter: &TimesheetFilter,
        scope: &RowScope,
    ) -> Result<Vec<TimesheetDetail>, sqlx::Error> {
        let mut select = detail_select();
        select.push(" WHERE TRUE");
        push_timesheet_filters(&mut select, filter, scope);
        select.push(" ORDER BY t.date ASC, t.created_at ASC");

        let rows = select
            .build_query_as::<TimesheetDetailRow>()
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(TimesheetDetail::from).collect())
    }
}

fn detail_select() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!(
        "SELECT {TIMESHEET_COLUMNS}, \
                u.first_name AS user_first_name, u.last_name AS user_last_name, \
                u.email AS user_email, p.name AS project_name, k.title AS task_title \
         FROM timesheets t \
         LEFT JOIN users u ON u.id = t.user_id \
         LEFT JOIN projects p ON p.id = t.project_id \
         LEFT JOIN tasks k ON k.id = t.task_id"
    ))
}

/// Appends the scope and filter predicates; shared by count and page queries
fn push_timesheet_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: &TimesheetFilter,
    scope: &RowScope,
) {
    push_timesheet_scope(qb, scope);

    if let Some(start_date) = filter.start_date {
        qb.push(" AND t.date >= ").push_bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        qb.push(" AND t.date <= ").push_bind(end_date);
    }
    if let Some(status) = filter.status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(project_id) = filter.project_id {
        qb.push(" AND t.project_id = ").push_bind(project_id);
    }
    if let Some(task_id) = filter.task_id {
        qb.push(" AND t.task_id = ").push_bind(task_id);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND t.user_id = ").push_bind(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Timesheet {
        Timesheet {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            hours: 8.0,
            description: None,
            billable: true,
            status: TimesheetStatus::Draft,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&TimesheetStatus::Submitted).unwrap(),
            "\"submitted\""
        );
        assert_eq!(TimesheetStatus::Rejected.to_string(), "rejected");
        assert_eq!(TimesheetStatus::default(), TimesheetStatus::Draft);
    }

    #[test]
    fn test_apply_changes() {
        let mut t = entry();
        let task = Uuid::new_v4();
        t.apply(TimesheetChanges {
            task_id: Some(task),
            hours: Some(6.5),
            description: Some(Some("Pairing".to_string())),
            ..Default::default()
        });

        assert_eq!(t.task_id, task);
        assert_eq!(t.hours, 6.5);
        assert_eq!(t.description.as_deref(), Some("Pairing"));
        assert!(t.billable);
        assert!(TimesheetChanges::default().is_empty());
    }

    #[test]
    fn test_detail_serialization() {
        let t = entry();
        let detail = TimesheetDetail::from(TimesheetDetailRow {
            timesheet: t.clone(),
            user_first_name: Some("Ada".to_string()),
            user_last_name: Some("Lovelace".to_string()),
            user_email: Some("ada@example.com".to_string()),
            project_name: Some("Website".to_string()),
            task_title: None,
        });

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["userId"], t.user_id.to_string());
        assert_eq!(json["date"], "2024-01-05");
        assert_eq!(json["user"]["firstName"], "Ada");
        assert_eq!(json["project"]["name"], "Website");
        assert!(json["task"].is_null());
    }

    #[test]
    fn test_filters_sql_in_order() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM timesheets t WHERE TRUE");
        push_timesheet_filters(
            &mut qb,
            &TimesheetFilter {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 7),
                user_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
            &RowScope::Own(Uuid::new_v4()),
        );
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM timesheets t WHERE TRUE AND t.user_id = $1 AND t.date >= $2 \
             AND t.date <= $3 AND t.user_id = $4"
        );
    }
}
