use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::{error, instrument};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/test-db", get(test_db))
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub message: String,
    pub success: bool,
}

/// Round-trips the database. A failed probe reports 500 and the pool retries
/// on the next request.
#[instrument(skip(state))]
pub async fn test_db(State(state): State<AppState>) -> (StatusCode, Json<ProbeResponse>) {
    match state.users.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ProbeResponse {
                message: "Database connection successful".into(),
                success: true,
            }),
        ),
        Err(e) => {
            error!(error = %e, "database probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProbeResponse {
                    message: "Database connection failed".into(),
                    success: false,
                }),
            )
        }
    }
}
