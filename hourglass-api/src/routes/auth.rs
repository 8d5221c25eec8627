/// Authentication endpoints
///
/// - `POST /api/auth/register`: create an employee account and sign in
/// - `POST /api/auth/login`: exchange credentials for tokens
/// - `POST /api/auth/refresh`: exchange a refresh token for a new access token
/// - `GET  /api/auth/me`: the authenticated user

use axum::{extract::State, Extension};
use hourglass_shared::{
    auth::{
        actor::Actor,
        jwt::{TokenPair, TokenType},
        password,
    },
    error::FieldError,
    models::user::{CreateUser, User, UserRole},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    response::ApiResponse,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// User plus tokens, returned by register and login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// `201 Created` with the new user and a token pair
///
/// # Errors
///
/// - `400`: validation failed, weak password, or email already registered
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    let problems = password::password_problems(&req.password);
    if !problems.is_empty() {
        return Err(ApiError::Validation(
            problems
                .into_iter()
                .map(|message| FieldError::new("password", message))
                .collect(),
        ));
    }

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password_hash,
            role: UserRole::Employee,
        },
    )
    .await?;

    let tokens = state.signer.issue_pair(user.id, user.role)?;
    info!(user_id = %user.id, "User registered");

    Ok(ApiResponse::created(
        SessionResponse { user, tokens },
        "User registered successfully",
    ))
}

/// # Errors
///
/// - `401`: unknown email or wrong password
/// - `403`: account deactivated
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;
    let tokens = state.signer.issue_pair(user.id, user.role)?;
    info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::ok(SessionResponse { user, tokens }).with_message("Login successful"))
}

/// # Errors
///
/// - `401`: invalid, expired or non-refresh token, or the account is gone or inactive
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    let claims = state.signer.verify(&req.refresh_token, TokenType::Refresh)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Account is not available".to_string()))?;

    let access_token = state.signer.issue(user.id, user.role, TokenType::Access)?;

    Ok(ApiResponse::ok(RefreshResponse {
        access_token,
        expires_in: state.signer.access_ttl().num_seconds(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<ApiResponse<User>> {
    let user = User::find_by_id(&state.db, actor.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok(user))
}
