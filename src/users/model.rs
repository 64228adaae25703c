use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Access level of an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String, // argon2 PHC string, never exposed
    pub name: String,
    pub birth_place: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub institution: Option<String>,
    pub phone: Option<String>,
    pub application_letter: Option<String>,
    pub profile_image: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub face_data: Option<Json<Vec<f64>>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Optional profile fields shared by registration, bootstrap and updates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub name: Option<String>,
    pub birth_place: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub institution: Option<String>,
    pub phone: Option<String>,
    pub application_letter: Option<String>,
    pub profile_image: Option<String>,
}

/// Insert payload; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub profile: ProfileFields,
    pub role: Role,
}

#[cfg(test)]
impl User {
    pub fn from_new(new: NewUser, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            name: new.name,
            birth_place: new.profile.birth_place,
            birth_date: new.profile.birth_date,
            address: new.profile.address,
            institution: new.profile.institution,
            phone: new.profile.phone,
            application_letter: new.profile.application_letter,
            profile_image: new.profile.profile_image,
            role: new.role,
            face_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the present fields of `update`, leaving the rest untouched.
    pub fn apply_profile(&mut self, update: ProfileFields, now: OffsetDateTime) {
        let ProfileFields {
            name,
            birth_place,
            birth_date,
            address,
            institution,
            phone,
            application_letter,
            profile_image,
        } = update;
        if let Some(v) = name {
            self.name = v;
        }
        if birth_place.is_some() {
            self.birth_place = birth_place;
        }
        if birth_date.is_some() {
            self.birth_date = birth_date;
        }
        if address.is_some() {
            self.address = address;
        }
        if institution.is_some() {
            self.institution = institution;
        }
        if phone.is_some() {
            self.phone = phone;
        }
        if application_letter.is_some() {
            self.application_letter = application_letter;
        }
        if profile_image.is_some() {
            self.profile_image = profile_image;
        }
        self.updated_at = now;
    }
}
