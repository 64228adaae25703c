use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        parse_face_data, AdminResponse, FaceDataRequest, FaceDataResponse, PublicUser,
        SetupAdminRequest, UserResponse, UsersResponse,
    },
    model::{NewUser, ProfileFields, Role, User},
};
use crate::{
    auth::{
        password::hash_password,
        session::{AdminUser, CurrentUser},
    },
    error::{AppError, OrConflict, Result},
    extract::{ApiJson, ApiPath, ApiQuery, Pagination},
    state::AppState,
    validation,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/face-data",
            get(get_face_data).post(register_face_data).delete(clear_face_data),
        )
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/me", get(admin_me))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user))
        .route("/setup-admin", post(setup_admin))
}

async fn load_user(state: &AppState, id: Uuid) -> Result<User> {
    state.users.find_by_id(id).await?.ok_or_else(|| {
        warn!(user_id = %id, "session refers to missing user");
        AppError::not_found("User not found")
    })
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<UserResponse>> {
    let user = load_user(&state, caller.id).await?;
    Ok(Json(UserResponse {
        message: "Profile fetched".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, update))]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiJson(mut update): ApiJson<ProfileFields>,
) -> Result<Json<UserResponse>> {
    if let Some(name) = update.name.as_deref() {
        update.name = Some(validation::required("name", Some(name))?);
    }

    let user = state
        .users
        .update_profile(caller.id, update)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(UserResponse {
        message: "Profile updated".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn get_face_data(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<FaceDataResponse>> {
    let user = load_user(&state, caller.id).await?;
    Ok(Json(FaceDataResponse {
        message: "Face data fetched".into(),
        face_data: user.face_data.map(|j| j.0),
    }))
}

#[instrument(skip(state, body))]
pub async fn register_face_data(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiJson(body): ApiJson<FaceDataRequest>,
) -> Result<Json<FaceDataResponse>> {
    let descriptors = parse_face_data(&body.face_data).ok_or_else(|| {
        AppError::validation("faceData must be a non-empty array of numbers")
    })?;

    if !state
        .users
        .set_face_data(caller.id, Some(descriptors.clone()))
        .await?
    {
        return Err(AppError::not_found("User not found"));
    }

    info!(user_id = %caller.id, len = descriptors.len(), "face data registered");
    Ok(Json(FaceDataResponse {
        message: "Face data registered".into(),
        face_data: Some(descriptors),
    }))
}

#[instrument(skip(state))]
pub async fn clear_face_data(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<FaceDataResponse>> {
    if !state.users.set_face_data(caller.id, None).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id = %caller.id, "face data cleared");
    Ok(Json(FaceDataResponse {
        message: "Face data removed".into(),
        face_data: None,
    }))
}

/// Identity of the calling admin. The stored role is re-checked, so a token
/// minted before a demotion does not pass.
#[instrument(skip(state))]
pub async fn admin_me(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
) -> Result<Json<AdminResponse>> {
    let user = load_user(&state, admin_id).await?;
    if user.role != Role::Admin {
        warn!(user_id = %admin_id, "admin token for non-admin record");
        return Err(AppError::unauthorized("Unauthorized: admin access required"));
    }
    Ok(Json(AdminResponse {
        message: "Admin fetched".into(),
        admin: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(p): ApiQuery<Pagination>,
) -> Result<Json<UsersResponse>> {
    let (limit, offset) = p.bounds();
    let users = state.users.list(limit, offset).await?;
    Ok(Json(UsersResponse {
        message: "Users fetched".into(),
        users: users.iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserResponse>> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserResponse {
        message: "User fetched".into(),
        user: PublicUser::from(&user),
    }))
}

/// One-time creation of the first admin account.
#[instrument(skip(state, payload))]
pub async fn setup_admin(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SetupAdminRequest>,
) -> Result<(StatusCode, Json<AdminResponse>)> {
    if state.users.admin_exists().await? {
        warn!("admin bootstrap attempted with an existing admin");
        return Err(AppError::validation("Admin already exists"));
    }

    let (username, email) =
        validation::credentials(&payload.username, &payload.email, &payload.password)?;
    let name = validation::required("name", payload.profile.name.as_deref())?;

    if state.users.username_or_email_taken(&username, &email).await? {
        return Err(AppError::validation("Username or email already registered"));
    }

    let password_hash = hash_password(&payload.password)?;
    let new = NewUser {
        username,
        email,
        password_hash,
        name,
        profile: payload.profile,
        role: Role::Admin,
    };

    let admin = state
        .users
        .create_first_admin(new)
        .await
        .or_conflict("Username or email already registered")?
        .ok_or_else(|| AppError::validation("Admin already exists"))?;

    info!(user_id = %admin.id, username = %admin.username, "admin bootstrapped");
    Ok((
        StatusCode::CREATED,
        Json(AdminResponse {
            message: "Admin created".into(),
            admin: PublicUser::from(&admin),
        }),
    ))
}
