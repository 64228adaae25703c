use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::model::Attendance;

#[async_trait]
pub trait AttendanceRepo: Send + Sync {
    async fn find_for_day(&self, user_id: Uuid, day: Date) -> anyhow::Result<Option<Attendance>>;
    async fn insert(&self, record: &Attendance) -> anyhow::Result<()>;
    /// Sets the check-out time on an open record. `None` if it was already closed.
    async fn close(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<Option<Attendance>>;
    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Attendance>>;
    async fn list_all(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Attendance>>;
}

#[derive(Clone)]
pub struct PgAttendanceRepo {
    db: PgPool,
}

impl PgAttendanceRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceRepo for PgAttendanceRepo {
    async fn find_for_day(&self, user_id: Uuid, day: Date) -> anyhow::Result<Option<Attendance>> {
        let row = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, day, check_in, check_out, status, note
              FROM attendances
             WHERE user_id = $1 AND day = $2
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.db)
        .await
        .context("find attendance for day")?;
        Ok(row)
    }

    async fn insert(&self, record: &Attendance) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attendances (id, user_id, day, check_in, check_out, status, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.day)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(record.status.as_str())
        .bind(&record.note)
        .execute(&self.db)
        .await
        .context("insert attendance")?;
        Ok(())
    }

    async fn close(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<Option<Attendance>> {
        let row = sqlx::query_as::<_, Attendance>(
            r#"
            UPDATE attendances
               SET check_out = $2, status = 'checked_out'
             WHERE id = $1 AND check_out IS NULL
            RETURNING id, user_id, day, check_in, check_out, status, note
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.db)
        .await
        .context("close attendance")?;
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, day, check_in, check_out, status, note
              FROM attendances
             WHERE user_id = $1
             ORDER BY check_in DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list attendance by user")?;
        Ok(rows)
    }

    async fn list_all(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT id, user_id, day, check_in, check_out, status, note
              FROM attendances
             ORDER BY check_in DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list attendance")?;
        Ok(rows)
    }
}
