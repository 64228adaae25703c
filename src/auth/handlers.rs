use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        session::SESSION_COOKIE,
    },
    error::{AppError, OrConflict, Result},
    extract::ApiJson,
    state::AppState,
    users::{
        dto::{PublicUser, UserResponse},
        model::{NewUser, Role, User},
    },
    validation,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

fn session_cookie(token: String, keys: &JwtKeys) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(keys.access_ttl.as_secs() as i64))
        .build()
}

fn issue_tokens(keys: &JwtKeys, user: &User) -> Result<(String, String)> {
    let access_token = keys.sign_access(user.id, user.role).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AppError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id, user.role).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AppError::Internal(e)
    })?;
    Ok((access_token, refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let (username, email) =
        validation::credentials(&payload.username, &payload.email, &payload.password)?;
    let name = validation::required("name", payload.profile.name.as_deref())?;

    let code_ok = state
        .codes
        .validate(payload.registration_code.trim(), OffsetDateTime::now_utc())
        .await?;
    if !code_ok {
        warn!(%username, "registration with invalid code");
        return Err(AppError::validation("Invalid or expired registration code"));
    }

    if state.users.username_or_email_taken(&username, &email).await? {
        warn!(%username, %email, "username or email already registered");
        return Err(AppError::validation("Username or email already registered"));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
            name,
            profile: payload.profile,
            role: Role::User,
        })
        .await
        .or_conflict("Username or email already registered")?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "Registration successful".into(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let identifier = payload.identifier.trim();
    if identifier.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Username/email and password are required"));
    }

    let Some(user) = state.users.find_by_login(identifier).await? else {
        warn!(%identifier, "login unknown user");
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = issue_tokens(&keys, &user)?;

    info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok((
        jar.add(session_cookie(access_token.clone(), &keys)),
        Json(AuthResponse {
            message: "Login successful".into(),
            access_token,
            refresh_token,
            user: PublicUser::from(&user),
        }),
    ))
}

/// Issues a new token pair. The role is read from the store, not the old token.
#[instrument(skip(state, jar, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::unauthorized("Invalid or expired refresh token")
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    let (access_token, refresh_token) = issue_tokens(&keys, &user)?;
    Ok((
        jar.add(session_cookie(access_token.clone(), &keys)),
        Json(AuthResponse {
            message: "Token refreshed".into(),
            access_token,
            refresh_token,
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out".into(),
        }),
    )
}
