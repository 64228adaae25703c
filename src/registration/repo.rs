use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::model::RegistrationCode;

#[async_trait]
pub trait RegistrationCodeRepo: Send + Sync {
    async fn insert(&self, code: &RegistrationCode) -> anyhow::Result<()>;
    /// Most recently created code that is active and unexpired at `now`.
    async fn latest_active(&self, now: OffsetDateTime) -> anyhow::Result<Option<RegistrationCode>>;
    async fn find_by_code(&self, code: &str) -> anyhow::Result<Vec<RegistrationCode>>;
    /// Flips `is_active` off on every active code; returns how many changed.
    async fn deactivate_all(&self) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgRegistrationCodeRepo {
    db: PgPool,
}

impl PgRegistrationCodeRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RegistrationCodeRepo for PgRegistrationCodeRepo {
    async fn insert(&self, code: &RegistrationCode) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO registration_codes (id, code, expires_at, is_active, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(code.id)
        .bind(&code.code)
        .bind(code.expires_at)
        .bind(code.is_active)
        .bind(code.created_by)
        .bind(code.created_at)
        .execute(&self.db)
        .await
        .context("insert registration code")?;
        Ok(())
    }

    async fn latest_active(&self, now: OffsetDateTime) -> anyhow::Result<Option<RegistrationCode>> {
        let row = sqlx::query_as::<_, RegistrationCode>(
            r#"
            SELECT id, code, expires_at, is_active, created_by, created_at
              FROM registration_codes
             WHERE is_active = TRUE AND expires_at > $1
             ORDER BY created_at DESC
             LIMIT 1
            "#,
        )
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("latest active registration code")?;
        Ok(row)
    }

    async fn find_by_code(&self, code: &str) -> anyhow::Result<Vec<RegistrationCode>> {
        let rows = sqlx::query_as::<_, RegistrationCode>(
            r#"
            SELECT id, code, expires_at, is_active, created_by, created_at
              FROM registration_codes
             WHERE code = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(code)
        .fetch_all(&self.db)
        .await
        .context("find registration code")?;
        Ok(rows)
    }

    async fn deactivate_all(&self) -> anyhow::Result<u64> {
        let res = sqlx::query(r#"UPDATE registration_codes SET is_active = FALSE WHERE is_active = TRUE"#)
            .execute(&self.db)
            .await
            .context("deactivate registration codes")?;
        Ok(res.rows_affected())
    }
}
