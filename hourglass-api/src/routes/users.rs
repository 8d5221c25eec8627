/// User administration
///
/// - `GET    /api/users`: list (admin/manager)
/// - `GET    /api/users/:id`: self or admin/manager
/// - `PUT    /api/users/:id`: self edits names and email; admin also role and active flag
/// - `DELETE /api/users/:id`: admin only, never self; referenced users are deactivated
/// - `GET    /api/users/:id/timesheets`: the user's entries, paginated
/// - `GET    /api/users/:id/stats`: hour totals and status counts

use axum::{extract::State, Extension};
use hourglass_shared::{
    access::RowScope,
    auth::{
        actor::Actor,
        authorization::{can_delete_user, can_list_users, can_view_user},
    },
    models::{
        timesheet::Timesheet,
        user::{UpdateUser, User, UserFilter, UserRole, UserStats},
        PageRequest,
    },
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    response::{paginated, ApiResponse},
    routes::timesheets::TimesheetQuery,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub role: Option<UserRole>,

    pub is_active: Option<bool>,
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        UpdateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            role: req.role,
            is_active: req.is_active,
        }
    }
}

/// Role and ownership rules for a user update
fn check_update(actor: &Actor, target: Uuid, req: &UpdateUserRequest) -> ApiResult<()> {
    let touches_admin_fields = req.role.is_some() || req.is_active.is_some();

    if !actor.is(target) && !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "You can only update your own profile".to_string(),
        ));
    }
    if touches_admin_fields && !actor.is_admin() {
        return Err(ApiError::Forbidden(
            "Only admins can change roles or account status".to_string(),
        ));
    }
    if actor.is(target) && req.role.is_some_and(|r| r != actor.role) {
        return Err(ApiError::Forbidden("You cannot change your own role".to_string()));
    }
    if actor.is(target) && req.is_active == Some(false) {
        return Err(ApiError::Forbidden(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    Ok(())
}

async fn load_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<ApiResponse<Value>> {
    if !can_list_users(&actor) {
        return Err(ApiError::Forbidden("Not allowed to list users".to_string()));
    }

    let page = PageRequest::new(query.page, query.limit);
    let filter = UserFilter {
        search: query.search,
        role: query.role,
        is_active: query.is_active,
    };

    let (users, total) = User::list(&state.db, &filter, page).await?;
    Ok(paginated("users", users, page, total)?)
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    if !can_view_user(&actor, id) {
        return Err(ApiError::Forbidden("Not allowed to view this user".to_string()));
    }

    Ok(ApiResponse::ok(load_user(&state, id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    check_update(&actor, id, &req)?;
    load_user(&state, id).await?;

    if let Some(email) = &req.email {
        if let Some(existing) = User::find_by_email(&state.db, email).await? {
            if existing.id != id {
                return Err(ApiError::Conflict("Email already exists".to_string()));
            }
        }
    }

    let changes = UpdateUser::from(req);
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let user = User::update(&state.db, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    info!(user_id = %user.id, updated_by = %actor.id, "User updated");

    Ok(ApiResponse::ok(user).with_message("User updated successfully"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    if actor.is(id) {
        return Err(ApiError::Forbidden("You cannot delete your own account".to_string()));
    }
    if !can_delete_user(&actor, id) {
        return Err(ApiError::Forbidden("Only admins can delete users".to_string()));
    }

    load_user(&state, id).await?;

    if User::is_referenced(&state.db, id).await? {
        User::update(
            &state.db,
            id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;
        info!(user_id = %id, deleted_by = %actor.id, "User deactivated (has related records)");
        return Ok(ApiResponse::message(
            "User has related records and was deactivated instead of deleted",
        ));
    }

    User::delete(&state.db, id).await?;
    info!(user_id = %id, deleted_by = %actor.id, "User deleted");
    Ok(ApiResponse::message("User deleted successfully"))
}

pub async fn user_timesheets(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<TimesheetQuery>,
) -> ApiResult<ApiResponse<Value>> {
    if !can_view_user(&actor, id) {
        return Err(ApiError::Forbidden(
            "Not allowed to view this user's timesheets".to_string(),
        ));
    }
    load_user(&state, id).await?;

    let page = query.page();
    let mut filter = query.into_filter();
    filter.user_id = Some(id);

    let (rows, total) =
        Timesheet::list(&state.db, &filter, &RowScope::for_actor(&actor), page).await?;
    Ok(paginated("timesheets", rows, page, total)?)
}

pub async fn user_stats(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<UserStats>> {
    if !can_view_user(&actor, id) {
        return Err(ApiError::Forbidden(
            "Not allowed to view this user's statistics".to_string(),
        ));
    }
    load_user(&state, id).await?;

    Ok(ApiResponse::ok(User::stats(&state.db, id).await?))
}
