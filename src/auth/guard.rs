//! Page-level access control.
//!
//! Every page navigation passes through [`access_guard`] before any file is
//! served. The decision itself is [`decide`], a pure function of the path and
//! the caller's [`Session`]. API handlers do not rely on it; they re-check
//! the session through the `CurrentUser` / `AdminUser` extractors.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::{jwt::JwtKeys, session::Session};

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const PUBLIC_PATHS: [&str; 3] = ["/", LOGIN_PATH, REGISTER_PATH];
pub const ADMIN_PREFIX: &str = "/admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Redirect(&'static str),
}

/// Paths the guard looks at. API routes and static assets bypass it.
pub fn is_guarded(path: &str) -> bool {
    !(path == "/api"
        || path.starts_with("/api/")
        || path.starts_with("/assets/")
        || path == "/favicon.ico")
}

pub fn decide(path: &str, session: &Session) -> Decision {
    // Logged-in callers never see the login/register pages.
    if path == LOGIN_PATH || path == REGISTER_PATH {
        if let Some(landing) = session.landing_path() {
            return Decision::Redirect(landing);
        }
    }

    if PUBLIC_PATHS.contains(&path) {
        return Decision::Proceed;
    }

    if path.starts_with(ADMIN_PREFIX) {
        return match session {
            Session::Admin { .. } => Decision::Proceed,
            Session::User { .. } => Decision::Redirect("/dashboard"),
            Session::Anonymous => Decision::Redirect(LOGIN_PATH),
        };
    }

    match session {
        Session::Anonymous => Decision::Redirect(LOGIN_PATH),
        Session::User { .. } | Session::Admin { .. } => Decision::Proceed,
    }
}

pub async fn access_guard(State(keys): State<JwtKeys>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if !is_guarded(&path) {
        return next.run(req).await;
    }

    let session = Session::resolve(req.headers(), &keys);
    match decide(&path, &session) {
        Decision::Proceed => next.run(req).await,
        Decision::Redirect(target) => {
            debug!(%path, target, role = ?session.role(), "access guard redirect");
            Redirect::temporary(target).into_response()
        }
    }
}
