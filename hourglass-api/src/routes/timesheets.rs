/// Time entries and the approval workflow
///
/// - `GET    /api/timesheets`: visible entries, paginated
/// - `POST   /api/timesheets`: new draft entry owned by the caller
/// - `GET    /api/timesheets/summary`: totals by project and by user
/// - `GET    /api/timesheets/:id`
/// - `PUT    /api/timesheets/:id`: field edits
/// - `PUT    /api/timesheets/:id/status`: submit, approve, reject, reopen
/// - `DELETE /api/timesheets/:id`
///
/// Business rules live in [`hourglass_shared::lifecycle`]; handlers only
/// translate requests and responses.

use axum::{extract::State, Extension};
use chrono::NaiveDate;
use hourglass_shared::{
    access::RowScope,
    auth::actor::Actor,
    lifecycle::{self, EntryInput},
    models::{
        double_option,
        timesheet::{Timesheet, TimesheetChanges, TimesheetDetail, TimesheetFilter, TimesheetStatus},
        PageRequest,
    },
    report::aggregate::{resolve, summarize, Summary},
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    response::{paginated, ApiResponse},
};

/// List filters shared with `GET /api/users/:id/timesheets`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<TimesheetStatus>,
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TimesheetQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn into_filter(self) -> TimesheetFilter {
        TimesheetFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            project_id: self.project_id,
            task_id: self.task_id,
            user_id: self.user_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

/// New entry; `status` and owner are not accepted from the client
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimesheetRequest {
    pub task_id: Uuid,

    /// Defaults to the task's project
    pub project_id: Option<Uuid>,

    pub date: NaiveDate,

    pub hours: f64,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_billable")]
    pub billable: bool,
}

fn default_billable() -> bool {
    true
}

impl From<CreateTimesheetRequest> for EntryInput {
    fn from(req: CreateTimesheetRequest) -> Self {
        EntryInput {
            task_id: req.task_id,
            project_id: req.project_id,
            date: req.date,
            hours: req.hours,
            description: req.description,
            billable: req.billable,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTimesheetRequest {
    pub task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub hours: Option<f64>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<Option<String>>,

    pub billable: Option<bool>,
}

impl From<UpdateTimesheetRequest> for TimesheetChanges {
    fn from(req: UpdateTimesheetRequest) -> Self {
        TimesheetChanges {
            task_id: req.task_id,
            project_id: req.project_id,
            date: req.date,
            hours: req.hours,
            description: req.description,
            billable: req.billable,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusRequest {
    pub status: TimesheetStatus,

    #[validate(length(max = 1000, message = "Rejection reason must be at most 1000 characters"))]
    pub rejection_reason: Option<String>,
}

async fn load_detail(state: &AppState, id: Uuid) -> ApiResult<TimesheetDetail> {
    Timesheet::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Timesheet not found".to_string()))
}

pub async fn list_timesheets(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<TimesheetQuery>,
) -> ApiResult<ApiResponse<Value>> {
    let page = query.page();
    let filter = query.into_filter();

    let (rows, total) =
        Timesheet::list(&state.db, &filter, &RowScope::for_actor(&actor), page).await?;
    Ok(paginated("timesheets", rows, page, total)?)
}

pub async fn get_timesheet(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<TimesheetDetail>> {
    lifecycle::find_visible(&state.db, &actor, id).await?;
    Ok(ApiResponse::ok(load_detail(&state, id).await?))
}

/// `201 Created`; the entry starts as `draft` and belongs to the caller
///
/// # Errors
///
/// - `400`: hours out of range, project/task mismatch, or a duplicate (user, task, date)
/// - `403`: the caller may not log time on the task
/// - `404`: the task does not exist
pub async fn create_timesheet(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(req): ValidatedJson<CreateTimesheetRequest>,
) -> ApiResult<ApiResponse<TimesheetDetail>> {
    let entry = lifecycle::create_entry(&state.db, &actor, req.into()).await?;
    let detail = load_detail(&state, entry.id).await?;

    Ok(ApiResponse::created(detail, "Timesheet entry created successfully"))
}

pub async fn update_timesheet(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTimesheetRequest>,
) -> ApiResult<ApiResponse<TimesheetDetail>> {
    let changes = TimesheetChanges::from(req);
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    lifecycle::update_entry(&state.db, &actor, id, changes).await?;
    let detail = load_detail(&state, id).await?;

    Ok(ApiResponse::ok(detail).with_message("Timesheet entry updated successfully"))
}

/// # Errors
///
/// - `400`: approving/rejecting an entry that is not `submitted`
/// - `403`: the caller may not perform the transition
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<StatusRequest>,
) -> ApiResult<ApiResponse<TimesheetDetail>> {
    let entry = lifecycle::change_status(
        &state.db,
        &actor,
        id,
        req.status,
        req.rejection_reason.as_deref(),
    )
    .await?;
    let detail = load_detail(&state, id).await?;

    Ok(ApiResponse::ok(detail).with_message(format!("Timesheet {}", entry.status)))
}

pub async fn delete_timesheet(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    lifecycle::delete_entry(&state.db, &actor, id).await?;
    Ok(ApiResponse::message("Timesheet entry deleted successfully"))
}

/// Totals over every visible entry matching the filters
pub async fn summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<ApiResponse<Summary>> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if end < start {
            return Err(ApiError::field("endDate", "End date must not be before start date"));
        }
    }

    let filter = TimesheetFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        user_id: query.user_id,
        project_id: query.project_id,
        ..Default::default()
    };

    let rows = Timesheet::list_all(&state.db, &filter, &RowScope::for_actor(&actor)).await?;
    let entries = resolve(rows)?;

    Ok(ApiResponse::ok(summarize(&entries)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults_billable_and_ignores_status() {
        let req: CreateTimesheetRequest = serde_json::from_str(
            r#"{"taskId":"00000000-0000-0000-0000-000000000001","date":"2024-01-05","hours":8,"status":"approved"}"#,
        )
        .unwrap();
        assert!(req.billable);
        assert!(req.project_id.is_none());

        let input = EntryInput::from(req);
        assert_eq!(input.hours, 8.0);
    }

    #[test]
    fn test_update_distinguishes_null_description() {
        let clear: UpdateTimesheetRequest =
            serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(clear.description, Some(None));

        let untouched: UpdateTimesheetRequest = serde_json::from_str(r#"{"hours":4}"#).unwrap();
        assert_eq!(untouched.description, None);
        assert!(!TimesheetChanges::from(untouched).is_empty());
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        let parsed: Result<UpdateTimesheetRequest, _> =
            serde_json::from_str(r#"{"status":"approved"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_status_request() {
        let req: StatusRequest =
            serde_json::from_str(r#"{"status":"rejected","rejectionReason":"Wrong task"}"#)
                .unwrap();
        assert_eq!(req.status, TimesheetStatus::Rejected);
        assert_eq!(req.rejection_reason.as_deref(), Some("Wrong task"));

        assert!(serde_json::from_str::<StatusRequest>(r#"{"status":"done"}"#).is_err());
    }

    #[test]
    fn test_query_into_filter() {
        let query = TimesheetQuery {
            status: Some(TimesheetStatus::Submitted),
            page: Some(3),
            limit: Some(500),
            ..Default::default()
        };
        let page = query.page();
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, PageRequest::MAX_LIMIT);
        assert_eq!(query.into_filter().status, Some(TimesheetStatus::Submitted));
    }
}
