use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Review, Task, TaskStatus};

#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn insert(&self, task: &Task) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Task>>;
    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Task>>;
    async fn list_all(
        &self,
        status: Option<TaskStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Task>>;
    async fn review(&self, id: Uuid, review: Review) -> anyhow::Result<Option<Task>>;
}

#[derive(Clone)]
pub struct PgTaskRepo {
    db: PgPool,
}

impl PgTaskRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn insert(&self, task: &Task) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, title, description, attachment_url, status,
                               feedback, reviewed_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.attachment_url)
        .bind(task.status.as_str())
        .bind(&task.feedback)
        .bind(task.reviewed_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.db)
        .await
        .context("insert task")?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, attachment_url, status, feedback,
                   reviewed_by, created_at, updated_at
              FROM tasks
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find task")?;
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, attachment_url, status, feedback,
                   reviewed_by, created_at, updated_at
              FROM tasks
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
        .context("list tasks by user")?;
        Ok(rows)
    }

    async fn list_all(
        &self,
        status: Option<TaskStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, attachment_url, status, feedback,
                   reviewed_by, created_at, updated_at
              FROM tasks
             WHERE $1::text IS NULL OR status = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list tasks")?;
        Ok(rows)
    }

    async fn review(&self, id: Uuid, review: Review) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
               SET status = $2, feedback = $3, reviewed_by = $4, updated_at = now()
             WHERE id = $1
            RETURNING id, user_id, title, description, attachment_url, status, feedback,
                      reviewed_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(review.status.as_str())
        .bind(review.feedback)
        .bind(review.reviewer)
        .fetch_optional(&self.db)
        .await
        .context("review task")?;
        Ok(row)
    }
}
