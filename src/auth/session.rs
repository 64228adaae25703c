use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys};
use crate::{error::AppError, users::model::Role};

/// Cookie carrying the access token for page navigations.
pub const SESSION_COOKIE: &str = "session";

/// Who is calling, as far as the presented token says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    User { id: Uuid },
    Admin { id: Uuid },
}

impl Session {
    pub fn from_claims(id: Uuid, role: Role) -> Self {
        match role {
            Role::User => Session::User { id },
            Role::Admin => Session::Admin { id },
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Session::Anonymous => None,
            Session::User { .. } => Some(Role::User),
            Session::Admin { .. } => Some(Role::Admin),
        }
    }

    /// Where a logged-in caller belongs; `None` for anonymous callers.
    pub fn landing_path(&self) -> Option<&'static str> {
        match self {
            Session::Anonymous => None,
            Session::User { .. } => Some("/dashboard"),
            Session::Admin { .. } => Some("/admin"),
        }
    }

    /// Resolves the session from `Authorization: Bearer` or the session cookie.
    /// Anything that does not verify as an access token is anonymous.
    pub fn resolve(headers: &HeaderMap, keys: &JwtKeys) -> Self {
        let Some(token) = bearer_token(headers).or_else(|| cookie_token(headers)) else {
            return Session::Anonymous;
        };

        match keys.verify(&token) {
            Ok(claims) if claims.kind == TokenKind::Access => {
                Session::from_claims(claims.sub, claims.role)
            }
            Ok(_) => {
                warn!("refresh token presented as session");
                Session::Anonymous
            }
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Session::Anonymous
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        Ok(Session::resolve(&parts.headers, &keys))
    }
}

/// Any logged-in caller; rejects anonymous requests with 401.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        match Session::resolve(&parts.headers, &keys) {
            Session::Anonymous => Err(AppError::unauthorized("Unauthorized")),
            Session::User { id } => Ok(CurrentUser { id, role: Role::User }),
            Session::Admin { id } => Ok(CurrentUser { id, role: Role::Admin }),
        }
    }
}

/// Admin-only caller; every other session is rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        match Session::resolve(&parts.headers, &keys) {
            Session::Admin { id } => Ok(AdminUser(id)),
            Session::User { id } => {
                warn!(user_id = %id, "non-admin session on admin endpoint");
                Err(AppError::unauthorized("Unauthorized: admin access required"))
            }
            Session::Anonymous => Err(AppError::unauthorized("Unauthorized")),
        }
    }
}
