use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(day_format, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    CheckedIn,
    CheckedOut,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::CheckedIn => "checked_in",
            AttendanceStatus::CheckedOut => "checked_out",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown attendance status: {0}")]
pub struct UnknownStatus(String);

impl TryFrom<String> for AttendanceStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "checked_in" => Ok(AttendanceStatus::CheckedIn),
            "checked_out" => Ok(AttendanceStatus::CheckedOut),
            _ => Err(UnknownStatus(value)),
        }
    }
}

/// One user's attendance for one UTC day.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "day_format")]
    pub day: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub check_in: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub check_out: Option<OffsetDateTime>,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

impl Attendance {
    pub fn check_in(user_id: Uuid, now: OffsetDateTime, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            day: now.date(),
            check_in: now,
            check_out: None,
            status: AttendanceStatus::CheckedIn,
            note,
        }
    }
}
