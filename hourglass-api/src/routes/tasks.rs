/// Task endpoints
///
/// - `GET    /api/tasks?projectId&status&priority&assignedTo&search&page&limit`
/// - `POST   /api/tasks`: admin/manager
/// - `GET    /api/tasks/:id`
/// - `PUT    /api/tasks/:id`: admin/manager any field; the assignee status and actual hours
/// - `DELETE /api/tasks/:id`: admin/manager

use axum::{extract::State, Extension};
use chrono::{NaiveDate, Utc};
use hourglass_shared::{
    access::RowScope,
    auth::{
        actor::Actor,
        authorization::{can_manage_tasks, can_update_task},
    },
    models::{
        double_option,
        project::Project,
        task::{
            ensure_assignable, validate_task_fields, NewTask, Task, TaskChanges, TaskDetail,
            TaskFilter, TaskStatus,
        },
        PageRequest, Priority,
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
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub project_id: Uuid,

    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    pub assigned_to: Option<Uuid>,
    pub estimated_hours: Option<f64>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub estimated_hours: Option<Option<f64>>,

    pub actual_hours: Option<f64>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl From<UpdateTaskRequest> for TaskChanges {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskChanges {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            assigned_to: req.assigned_to,
            estimated_hours: req.estimated_hours,
            actual_hours: req.actual_hours,
            due_date: req.due_date,
        }
    }
}

async fn load_detail(state: &AppState, id: Uuid) -> ApiResult<TaskDetail> {
    Task::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<TaskQuery>,
) -> ApiResult<ApiResponse<Value>> {
    let page = PageRequest::new(query.page, query.limit);
    let filter = TaskFilter {
        project_id: query.project_id,
        status: query.status,
        priority: query.priority,
        assigned_to: query.assigned_to,
        search: query.search,
    };

    let (tasks, total) =
        Task::list(&state.db, &filter, &RowScope::for_actor(&actor), page).await?;
    Ok(paginated("tasks", tasks, page, total)?)
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<TaskDetail>> {
    let detail = load_detail(&state, id).await?;

    if !RowScope::for_actor(&actor).allows_task(&detail.task) {
        return Err(ApiError::Forbidden("Not allowed to view this task".to_string()));
    }

    Ok(ApiResponse::ok(detail))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<ApiResponse<TaskDetail>> {
    if !can_manage_tasks(&actor) {
        return Err(ApiError::Forbidden(
            "Only admins and managers can create tasks".to_string(),
        ));
    }

    let errors = validate_task_fields(&req.title, req.estimated_hours, 0.0);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if Project::find_by_id(&state.db, req.project_id).await?.is_none() {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    if let Some(assignee) = req.assigned_to {
        ensure_assignable(&state.db, assignee).await?;
    }

    let task = Task::create(
        &state.db,
        NewTask {
            project_id: req.project_id,
            title: req.title.trim().to_string(),
            description: req.description,
            status: req.status,
            priority: req.priority,
            assigned_to: req.assigned_to,
            created_by: actor.id,
            estimated_hours: req.estimated_hours,
            due_date: req.due_date,
        },
    )
    .await?;
    info!(task_id = %task.id, project_id = %task.project_id, created_by = %actor.id, "Task created");

    Ok(ApiResponse::created(
        load_detail(&state, task.id).await?,
        "Task created successfully",
    ))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskDetail>> {
    let mut task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let changes = TaskChanges::from(req);
    if !can_update_task(&actor, &task, &changes) {
        return Err(ApiError::Forbidden(
            "Assignees may only update status and actual hours".to_string(),
        ));
    }
    if let Some(Some(assignee)) = changes.assigned_to {
        ensure_assignable(&state.db, assignee).await?;
    }

    task.apply(changes, Utc::now());
    let errors = task.validate();
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    task.save(&state.db).await?;
    info!(task_id = %id, updated_by = %actor.id, "Task updated");

    Ok(ApiResponse::ok(load_detail(&state, id).await?).with_message("Task updated successfully"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    if !can_manage_tasks(&actor) {
        return Err(ApiError::Forbidden(
            "Only admins and managers can delete tasks".to_string(),
        ));
    }

    if !Task::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    info!(task_id = %id, deleted_by = %actor.id, "Task deleted");

    Ok(ApiResponse::message("Task deleted successfully"))
}
