use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::model::Attendance;
use crate::{
    auth::session::{AdminUser, CurrentUser},
    error::{AppError, OrConflict, Result},
    extract::{ApiQuery, OptionalJson, Pagination},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(my_attendance))
        .route("/attendance/check-in", post(check_in))
        .route("/attendance/check-out", post(check_out))
        .route("/admin/attendance", get(all_attendance))
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckInRequest {
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub message: String,
    pub attendance: Attendance,
}

#[derive(Debug, Serialize)]
pub struct AttendanceListResponse {
    pub message: String,
    pub attendances: Vec<Attendance>,
}

#[instrument(skip(state, body))]
pub async fn check_in(
    State(state): State<AppState>,
    caller: CurrentUser,
    OptionalJson(body): OptionalJson<CheckInRequest>,
) -> Result<(StatusCode, Json<AttendanceResponse>)> {
    let now = OffsetDateTime::now_utc();
    if state
        .attendance
        .find_for_day(caller.id, now.date())
        .await?
        .is_some()
    {
        warn!(user_id = %caller.id, "duplicate check-in");
        return Err(AppError::validation("Already checked in today"));
    }

    let note = body
        .and_then(|b| b.note)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let record = Attendance::check_in(caller.id, now, note);
    state
        .attendance
        .insert(&record)
        .await
        .or_conflict("Already checked in today")?;

    info!(user_id = %caller.id, attendance_id = %record.id, "checked in");
    Ok((
        StatusCode::CREATED,
        Json(AttendanceResponse {
            message: "Check-in recorded".into(),
            attendance: record,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn check_out(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<AttendanceResponse>> {
    let now = OffsetDateTime::now_utc();
    let open = state
        .attendance
        .find_for_day(caller.id, now.date())
        .await?
        .ok_or_else(|| AppError::validation("No check-in recorded today"))?;

    let record = state
        .attendance
        .close(open.id, now)
        .await?
        .ok_or_else(|| AppError::validation("Already checked out today"))?;

    info!(user_id = %caller.id, attendance_id = %record.id, "checked out");
    Ok(Json(AttendanceResponse {
        message: "Check-out recorded".into(),
        attendance: record,
    }))
}

#[instrument(skip(state))]
pub async fn my_attendance(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> Result<Json<AttendanceListResponse>> {
    let (limit, offset) = p.bounds();
    let attendances = state.attendance.list_by_user(caller.id, limit, offset).await?;
    Ok(Json(AttendanceListResponse {
        message: "Attendance fetched".into(),
        attendances,
    }))
}

#[instrument(skip(state))]
pub async fn all_attendance(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> Result<Json<AttendanceListResponse>> {
    let (limit, offset) = p.bounds();
    let attendances = state.attendance.list_all(limit, offset).await?;
    Ok(Json(AttendanceListResponse {
        message: "Attendance fetched".into(),
        attendances,
    }))
}
