/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`. Errors render as
///
/// ```json
/// { "success": false, "message": "...", "errors": [{ "field": "...", "message": "..." }] }
/// ```
///
/// with `errors` present only for validation failures.
///
/// # Example
///
/// ```
/// use hourglass_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(id: Option<u32>) -> ApiResult<Json<Value>> {
///     let id = id.ok_or_else(|| ApiError::BadRequest("id is required".to_string()))?;
///     Ok(Json(json!({ "success": true, "data": id })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hourglass_shared::{
    auth::{jwt::JwtError, password::PasswordError},
    error::{DomainError, FieldError},
    report::ReportError,
};
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Role or ownership check failed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity missing (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (400)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Field-level validation failures (400)
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Storage or rendering failure (500); the message is logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Conflict(_) | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => (msg, None),
            ApiError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            errors,
        });

        (status, body).into_response()
    }
}

/// Maps constraint violations onto client errors; anything else is internal
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.constraint() {
                Some("users_email_key") => ApiError::Conflict("Email already exists".to_string()),
                Some("timesheets_user_task_date_key") => ApiError::Conflict(
                    "A timesheet entry already exists for this task and date".to_string(),
                ),
                Some("timesheets_hours_check") => {
                    ApiError::field("hours", "Hours must be greater than 0 and at most 24")
                }
                Some("timesheets_task_project_fkey") => {
                    ApiError::field("projectId", "Task does not belong to the given project")
                }
                Some("projects_date_range_check") => {
                    ApiError::field("endDate", "End date must not be before start date")
                }
                Some(constraint) if db_err.is_foreign_key_violation() => {
                    tracing::warn!(constraint, "Foreign key violation");
                    ApiError::BadRequest("Referenced record does not exist".to_string())
                }
                Some(constraint) if db_err.is_unique_violation() => {
                    ApiError::Conflict(format!("Duplicate value violates {constraint}"))
                }
                _ => ApiError::Internal(format!("Database error: {db_err}")),
            },
            other => ApiError::Internal(format!("Database error: {other}")),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => ApiError::Validation(errors),
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::Forbidden(msg) => ApiError::Forbidden(msg),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::Database(err) => ApiError::from(err),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Database(err) => ApiError::from(err),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("Serialization failed: {err}"))
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {err}"))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::Internal(format!("Token creation failed: {msg}")),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}
