use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCode {
    pub id: Uuid,
    pub code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RegistrationCode {
    /// Active and not yet expired. A code expiring exactly at `now` is invalid.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.is_active && self.expires_at > now
    }
}
