use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::instrument;

use super::model::RegistrationCode;
use crate::{
    auth::session::AdminUser,
    error::{AppError, Result},
    extract::{ApiJson, OptionalJson},
    state::AppState,
};

const MAX_TTL_MINUTES: i64 = 60 * 24 * 7;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/registration-codes", post(issue_code))
        .route(
            "/admin/registration-codes/current",
            get(current_code).delete(revoke_code),
        )
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/registration-codes/validate", post(validate_code))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCodeRequest {
    pub expires_in_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub message: String,
    pub code: RegistrationCode,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub message: String,
    pub deactivated: u64,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateCodeResponse {
    pub message: String,
    pub valid: bool,
}

#[instrument(skip(state, body))]
pub async fn issue_code(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    OptionalJson(body): OptionalJson<IssueCodeRequest>,
) -> Result<(StatusCode, Json<CodeResponse>)> {
    let minutes = body
        .and_then(|b| b.expires_in_minutes)
        .unwrap_or(state.config.registration_code_ttl_minutes);
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        return Err(AppError::validation(format!(
            "expiresInMinutes must be between 1 and {MAX_TTL_MINUTES}"
        )));
    }

    let code = state
        .codes
        .issue(Some(admin_id), Duration::minutes(minutes), OffsetDateTime::now_utc())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CodeResponse {
            message: "Registration code generated".into(),
            code,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn current_code(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<CodeResponse>> {
    let code = state
        .codes
        .current_active(OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| AppError::not_found("No active registration code"))?;

    Ok(Json(CodeResponse {
        message: "Active registration code".into(),
        code,
    }))
}

#[instrument(skip(state))]
pub async fn revoke_code(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<RevokeResponse>> {
    let deactivated = state.codes.revoke_current().await?;
    Ok(Json(RevokeResponse {
        message: "Registration code deactivated".into(),
        deactivated,
    }))
}

#[instrument(skip(state, body))]
pub async fn validate_code(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ValidateCodeRequest>,
) -> Result<Json<ValidateCodeResponse>> {
    let valid = state
        .codes
        .validate(&body.code, OffsetDateTime::now_utc())
        .await?;
    let message = if valid {
        "Registration code is valid"
    } else {
        "Invalid or expired registration code"
    };
    Ok(Json(ValidateCodeResponse {
        message: message.into(),
        valid,
    }))
}
