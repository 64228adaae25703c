use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::Notification;

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn insert(&self, n: &Notification) -> anyhow::Result<()>;
    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Notification>>;
    /// Marks a notification owned by `user_id` as read; `false` if there is none.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgNotificationRepo {
    db: PgPool,
}

impl PgNotificationRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepo for PgNotificationRepo {
    async fn insert(&self, n: &Notification) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, message, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(n.id)
        .bind(n.user_id)
        .bind(&n.message)
        .bind(n.is_read)
        .bind(n.created_at)
        .execute(&self.db)
        .await
        .context("insert notification")?;
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, message, is_read, created_at
              FROM notifications
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list notifications")?;
        Ok(rows)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2"#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .context("mark notification read")?;
        Ok(res.rows_affected() > 0)
    }
}
