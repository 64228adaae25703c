pub mod dto;
pub mod handlers;
pub mod model;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::profile_routes())
        .merge(handlers::admin_routes())
}
