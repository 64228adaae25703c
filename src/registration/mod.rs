pub mod handlers;
pub mod model;
pub mod repo;
pub mod service;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::admin_routes())
        .merge(handlers::public_routes())
}
