/// Project endpoints
///
/// - `GET    /api/projects?status&priority&search&page&limit`: visible projects with `taskStats`
/// - `POST   /api/projects`: admin/manager
/// - `GET    /api/projects/:id`
/// - `PUT    /api/projects/:id`: admin, or the manager who manages or created it
/// - `DELETE /api/projects/:id`: admin; removes its tasks and their timesheets

use axum::{extract::State, Extension};
use chrono::NaiveDate;
use hourglass_shared::{
    access::RowScope,
    auth::{
        actor::Actor,
        authorization::{can_create_project, can_delete_project, can_update_project},
    },
    models::{
        double_option,
        project::{
            validate_project_fields, NewProject, Project, ProjectChanges, ProjectFilter,
            ProjectStatus, ProjectWithStats,
        },
        user::User,
        PageRequest, Priority,
    },
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    response::{paginated, ApiResponse},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub status: ProjectStatus,

    #[serde(default)]
    pub priority: Priority,

    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<Option<String>>,

    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "double_option")]
    pub budget: Option<Option<f64>>,

    #[serde(default, deserialize_with = "double_option")]
    pub manager_id: Option<Option<Uuid>>,
}

impl From<UpdateProjectRequest> for ProjectChanges {
    fn from(req: UpdateProjectRequest) -> Self {
        ProjectChanges {
            name: req.name,
            description: req.description,
            status: req.status,
            priority: req.priority,
            start_date: req.start_date,
            end_date: req.end_date,
            budget: req.budget,
            manager_id: req.manager_id,
        }
    }
}

/// A project manager must be an active admin or manager
async fn ensure_manager(pool: &PgPool, manager_id: Uuid) -> ApiResult<()> {
    match User::find_by_id(pool, manager_id).await? {
        Some(user) if user.is_active && user.role.is_privileged() => Ok(()),
        Some(_) => Err(ApiError::field(
            "managerId",
            "Project manager must be an active admin or manager",
        )),
        None => Err(ApiError::field("managerId", "Project manager not found")),
    }
}

async fn load_project(state: &AppState, id: Uuid) -> ApiResult<Project> {
    Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

async fn with_stats(state: &AppState, project: Project) -> ApiResult<ProjectWithStats> {
    Project::with_stats(&state.db, vec![project])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal("Project statistics missing".to_string()))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> ApiResult<ApiResponse<Value>> {
    let page = PageRequest::new(query.page, query.limit);
    let filter = ProjectFilter {
        status: query.status,
        priority: query.priority,
        search: query.search,
    };

    let (projects, total) =
        Project::list(&state.db, &filter, &RowScope::for_actor(&actor), page).await?;
    let projects = Project::with_stats(&state.db, projects).await?;

    Ok(paginated("projects", projects, page, total)?)
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<ProjectWithStats>> {
    let project = load_project(&state, id).await?;

    if !RowScope::for_actor(&actor).allows_project(&project) {
        return Err(ApiError::Forbidden("Not allowed to view this project".to_string()));
    }

    Ok(ApiResponse::ok(with_stats(&state, project).await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<ApiResponse<ProjectWithStats>> {
    if !can_create_project(&actor) {
        return Err(ApiError::Forbidden(
            "Only admins and managers can create projects".to_string(),
        ));
    }

    let errors = validate_project_fields(&req.name, req.start_date, req.end_date, req.budget);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    if let Some(manager_id) = req.manager_id {
        ensure_manager(&state.db, manager_id).await?;
    }

    let project = Project::create(
        &state.db,
        NewProject {
            name: req.name.trim().to_string(),
            description: req.description,
            status: req.status,
            priority: req.priority,
            start_date: req.start_date,
            end_date: req.end_date,
            budget: req.budget,
            manager_id: req.manager_id,
            created_by: actor.id,
        },
    )
    .await?;
    info!(project_id = %project.id, created_by = %actor.id, "Project created");

    Ok(ApiResponse::created(
        with_stats(&state, project).await?,
        "Project created successfully",
    ))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<ProjectWithStats>> {
    let mut project = load_project(&state, id).await?;

    if !can_update_project(&actor, &project) {
        return Err(ApiError::Forbidden(
            "Not allowed to update this project".to_string(),
        ));
    }

    let changes = ProjectChanges::from(req);
    if let Some(Some(manager_id)) = changes.manager_id {
        ensure_manager(&state.db, manager_id).await?;
    }

    project.apply(changes);
    let errors = project.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let saved = project.save(&state.db).await?;
    info!(project_id = %saved.id, updated_by = %actor.id, "Project updated");

    Ok(ApiResponse::ok(with_stats(&state, saved).await?)
        .with_message("Project updated successfully"))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    if !can_delete_project(&actor) {
        return Err(ApiError::Forbidden("Only admins can delete projects".to_string()));
    }

    if !Project::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    info!(project_id = %id, deleted_by = %actor.id, "Project deleted");

    Ok(ApiResponse::message("Project deleted successfully"))
}
