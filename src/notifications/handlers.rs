use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use super::model::Notification;
use crate::{
    auth::session::CurrentUser,
    error::{AppError, Result},
    extract::{ApiPath, ApiQuery, Pagination},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", post(mark_read))
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub message: String,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub message: String,
    pub success: bool,
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> Result<Json<NotificationsResponse>> {
    let (limit, offset) = p.bounds();
    let notifications = state.notifications.list_by_user(caller.id, limit, offset).await?;
    Ok(Json(NotificationsResponse {
        message: "Notifications fetched".into(),
        notifications,
    }))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MarkReadResponse>> {
    if !state.notifications.mark_read(id, caller.id).await? {
        return Err(AppError::not_found("Notification not found"));
    }
    Ok(Json(MarkReadResponse {
        message: "Notification marked as read".into(),
        success: true,
    }))
}
