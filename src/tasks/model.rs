use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Approved,
    Rejected,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Approved => "approved",
            TaskStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(String);

impl TryFrom<String> for TaskStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "approved" => Ok(TaskStatus::Approved),
            "rejected" => Ok(TaskStatus::Rejected),
            _ => Err(UnknownStatus(value)),
        }
    }
}

/// Work submitted by a user for admin review.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub attachment_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub feedback: Option<String>,
    pub reviewed_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Outcome of an admin review.
#[derive(Debug, Clone)]
pub struct Review {
    pub status: TaskStatus,
    pub feedback: Option<String>,
    pub reviewer: Uuid,
}
