/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'manager', 'employee');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL,          -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'employee',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Users are never hard-deleted while other rows reference them; see
/// [`User::is_referenced`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::PageRequest;

const USER_COLUMNS: &str = "id, first_name, last_name, email, password_hash, role, is_active, \
                            last_login_at, created_at, updated_at";

/// Role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access, including user and project deletion
    Admin,

    /// Sees all rows, approves timesheets, manages projects and tasks
    Manager,

    /// Sees and edits own rows only
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Employee => "employee",
        }
    }

    /// Admin or manager
    pub fn is_privileged(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    pub first_name: String,

    pub last_name: String,

    /// Stored lowercase
    pub email: String,

    /// Argon2id hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: UserRole,

    /// Inactive users cannot log in and cannot be assigned tasks
    pub is_active: bool,

    pub last_login_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,
    pub role: UserRole,
}

/// Input for updating a user; `None` leaves a column unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

/// List filters for users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match on first name, last name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Aggregated activity for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_entries: i64,
    pub total_hours: f64,
    pub billable_hours: f64,
    pub draft_entries: i64,
    pub submitted_entries: i64,
    pub approved_entries: i64,
    pub rejected_entries: i64,
    pub assigned_tasks: i64,
    pub completed_tasks: i64,
}

/// Normalizes an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_email_key` if the email exists
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (first_name, last_name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.first_name.trim())
            .bind(data.last_name.trim())
            .bind(normalize_email(&data.email))
            .bind(data.password_hash)
            .bind(data.role)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(normalize_email(email))
            .fetch_optional(pool)
            .await
    }

    /// Updates the given columns and bumps `updated_at`
    ///
    /// Returns `None` if the user does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET \
                first_name = COALESCE($2, first_name), \
                last_name = COALESCE($3, last_name), \
                email = COALESCE($4, email), \
                role = COALESCE($5, role), \
                is_active = COALESCE($6, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(data.first_name.map(|s| s.trim().to_string()))
            .bind(data.last_name.map(|s| s.trim().to_string()))
            .bind(data.email.as_deref().map(normalize_email))
            .bind(data.role)
            .bind(data.is_active)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Permanently deletes a user
    ///
    /// Callers must check [`User::is_referenced`] first; referenced users are
    /// protected by `ON DELETE RESTRICT` foreign keys.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// True if any project, task or timesheet references the user
    pub async fn is_referenced(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM projects WHERE manager_id = $1 OR created_by = $1)
                OR EXISTS (SELECT 1 FROM tasks WHERE assigned_to = $1 OR created_by = $1)
                OR EXISTS (SELECT 1 FROM timesheets WHERE user_id = $1 OR approved_by = $1)
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// True if at least one active admin exists
    pub async fn admin_exists(pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin' AND is_active)",
        )
        .fetch_one(pool)
        .await
    }

    /// Lists users matching `filter`, newest first, with the total match count
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u WHERE TRUE");
        push_user_filters(&mut count, filter);
        let (total,): (i64,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE TRUE"
        ));
        push_user_filters(&mut select, filter);
        select
            .push(" ORDER BY u.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let users = select.build_query_as::<User>().fetch_all(pool).await?;

        Ok((users, total))
    }

    /// Computes timesheet and task statistics for a user
    pub async fn stats(pool: &PgPool, id: Uuid) -> Result<UserStats, sqlx::Error> {
        sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                COUNT(t.id) AS total_entries,
                COALESCE(SUM(t.hours), 0)::float8 AS total_hours,
                COALESCE(SUM(t.hours) FILTER (WHERE t.billable), 0)::float8 AS billable_hours,
                COUNT(t.id) FILTER (WHERE t.status = 'draft') AS draft_entries,
                COUNT(t.id) FILTER (WHERE t.status = 'submitted') AS submitted_entries,
                COUNT(t.id) FILTER (WHERE t.status = 'approved') AS approved_entries,
                COUNT(t.id) FILTER (WHERE t.status = 'rejected') AS rejected_entries,
                (SELECT COUNT(*) FROM tasks k WHERE k.assigned_to = $1) AS assigned_tasks,
                (SELECT COUNT(*) FROM tasks k WHERE k.assigned_to = $1 AND k.status = 'done')
                    AS completed_tasks
            FROM timesheets t
            WHERE t.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (u.first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role {
        qb.push(" AND u.role = ").push_bind(role);
    }
    if let Some(is_active) = filter.is_active {
        qb.push(" AND u.is_active = ").push_bind(is_active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_privileges() {
        assert!(UserRole::Admin.is_privileged());
        assert!(UserRole::Manager.is_privileged());
        assert!(!UserRole::Employee.is_privileged());
        assert_eq!(UserRole::Manager.as_str(), "manager");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Employee,
            is_active: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["role"], "employee");
    }

    #[test]
    fn test_user_filters_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM users u WHERE TRUE");
        push_user_filters(
            &mut qb,
            &UserFilter {
                search: Some("ada".to_string()),
                role: Some(UserRole::Manager),
                is_active: Some(true),
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("u.first_name ILIKE $1"));
        assert!(sql.contains("u.email ILIKE $3"));
        assert!(sql.contains("u.role = $4"));
        assert!(sql.contains("u.is_active = $5"));
    }

    #[test]
    fn test_blank_search_ignored() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_user_filters(
            &mut qb,
            &UserFilter {
                search: Some("   ".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");
    }

    #[test]
    fn test_update_user_is_empty() {
        assert!(UpdateUser::default().is_empty());
        assert!(!UpdateUser {
            is_active: Some(false),
            ..Default::default()
        }
        .is_empty());
    }
}
