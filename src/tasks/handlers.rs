use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::model::{Review, Task, TaskStatus};
use crate::{
    auth::session::{AdminUser, CurrentUser},
    error::{AppError, Result},
    extract::{ApiJson, ApiPath, ApiQuery, Pagination},
    notifications::model::Notification,
    state::AppState,
    users::model::Role,
    validation,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(my_tasks).post(submit_task))
        .route("/tasks/:id", get(get_task))
        .route("/admin/tasks", get(all_tasks))
        .route("/admin/tasks/:id/review", patch(review_task))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTaskRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: TaskStatus,
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub message: String,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub message: String,
    pub tasks: Vec<Task>,
}

#[instrument(skip(state, body))]
pub async fn submit_task(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiJson(body): ApiJson<SubmitTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    let title = validation::required("title", body.title.as_deref())?;
    let attachment_url = body
        .attachment_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    if let Some(url) = attachment_url.as_deref() {
        if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')) {
            return Err(AppError::validation("attachmentUrl must be an http(s) URL or a path"));
        }
    }

    let now = OffsetDateTime::now_utc();
    let task = Task {
        id: Uuid::new_v4(),
        user_id: caller.id,
        title,
        description: body.description.trim().to_string(),
        attachment_url,
        status: TaskStatus::Pending,
        feedback: None,
        reviewed_by: None,
        created_at: now,
        updated_at: now,
    };
    state.tasks.insert(&task).await?;

    info!(user_id = %caller.id, task_id = %task.id, "task submitted");
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            message: "Task submitted".into(),
            task,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn my_tasks(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> Result<Json<TaskListResponse>> {
    let (limit, offset) = p.bounds();
    let tasks = state.tasks.list_by_user(caller.id, limit, offset).await?;
    Ok(Json(TaskListResponse {
        message: "Tasks fetched".into(),
        tasks,
    }))
}

/// Owners see their own tasks; admins see any. Others get 404, not 401,
/// so task ids do not leak.
#[instrument(skip(state))]
pub async fn get_task(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<TaskResponse>> {
    let task = state
        .tasks
        .find_by_id(id)
        .await?
        .filter(|t| caller.role == Role::Admin || t.user_id == caller.id)
        .ok_or_else(|| AppError::not_found("Task not found"))?;
    Ok(Json(TaskResponse {
        message: "Task fetched".into(),
        task,
    }))
}

#[instrument(skip(state))]
pub async fn all_tasks(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(p): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<StatusFilter>,
) -> Result<Json<TaskListResponse>> {
    let (limit, offset) = p.bounds();
    let tasks = state.tasks.list_all(filter.status, limit, offset).await?;
    Ok(Json(TaskListResponse {
        message: "Tasks fetched".into(),
        tasks,
    }))
}

#[instrument(skip(state, body))]
pub async fn review_task(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> Result<Json<TaskResponse>> {
    if body.status == TaskStatus::Pending {
        return Err(AppError::validation("status must be approved or rejected"));
    }
    let feedback = body
        .feedback
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    let task = state
        .tasks
        .review(
            id,
            Review {
                status: body.status,
                feedback,
                reviewer: admin_id,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found("Task not found"))?;

    let notice = Notification::new(
        task.user_id,
        format!("Your task \"{}\" was {}", task.title, task.status.as_str()),
        OffsetDateTime::now_utc(),
    );
    // The review is already saved; a lost notification must not undo that.
    if let Err(e) = state.notifications.insert(&notice).await {
        error!(error = %e, task_id = %task.id, user_id = %task.user_id, "review notification not stored");
    }

    info!(task_id = %task.id, status = task.status.as_str(), reviewer = %admin_id, "task reviewed");
    Ok(Json(TaskResponse {
        message: "Task reviewed".into(),
        task,
    }))
}
