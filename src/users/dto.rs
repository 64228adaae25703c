use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{ProfileFields, Role, User};

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub birth_place: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub institution: Option<String>,
    pub phone: Option<String>,
    pub application_letter: Option<String>,
    pub profile_image: Option<String>,
    pub role: Role,
    pub has_face_data: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            name: u.name.clone(),
            birth_place: u.birth_place.clone(),
            birth_date: u.birth_date.clone(),
            address: u.address.clone(),
            institution: u.institution.clone(),
            phone: u.phone.clone(),
            application_letter: u.application_letter.clone(),
            profile_image: u.profile_image.clone(),
            role: u.role,
            has_face_data: u.face_data.is_some(),
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub message: String,
    pub admin: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub message: String,
    pub users: Vec<PublicUser>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDataResponse {
    pub message: String,
    pub face_data: Option<Vec<f64>>,
}

/// `faceData` is kept as raw JSON so a wrong shape is a 400, not a parse failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDataRequest {
    #[serde(default)]
    pub face_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SetupAdminRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// Face descriptors must be a non-empty array of finite numbers.
pub fn parse_face_data(value: &serde_json::Value) -> Option<Vec<f64>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_f64().filter(|f| f.is_finite()))
        .collect()
}
