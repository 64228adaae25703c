use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::model::{NewUser, ProfileFields, User};

/// Partial unique index allowing a single admin row.
const SINGLE_ADMIN_INDEX: &str = "users_single_admin_idx";

const USER_COLUMNS: &str = "id, username, email, password_hash, name, birth_place, birth_date, \
     address, institution, phone, application_letter, profile_image, role, face_data, \
     created_at, updated_at";

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Looks a user up by username or (lowercased) email.
    async fn find_by_login(&self, identifier: &str) -> anyhow::Result<Option<User>>;
    async fn username_or_email_taken(&self, username: &str, email: &str) -> anyhow::Result<bool>;
    async fn admin_exists(&self) -> anyhow::Result<bool>;
    async fn create(&self, new: NewUser) -> anyhow::Result<User>;
    /// Inserts `new` only if no admin exists yet. Returns `None` when one does.
    async fn create_first_admin(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    async fn update_profile(&self, id: Uuid, update: ProfileFields) -> anyhow::Result<Option<User>>;
    /// Returns `false` when the user does not exist.
    async fn set_face_data(&self, id: Uuid, face_data: Option<Vec<f64>>) -> anyhow::Result<bool>;
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_login(&self, identifier: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = lower($1) LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.db)
        .await
        .context("find user by login")?;
        Ok(user)
    }

    async fn username_or_email_taken(&self, username: &str, email: &str) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)"#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.db)
        .await
        .context("check username/email")?;
        Ok(taken)
    }

    async fn admin_exists(&self) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')"#)
                .fetch_one(&self.db)
                .await
                .context("check admin exists")?;
        Ok(exists)
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, name, birth_place, birth_date,
                               address, institution, phone, application_letter, profile_image, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.profile.birth_place)
        .bind(&new.profile.birth_date)
        .bind(&new.profile.address)
        .bind(&new.profile.institution)
        .bind(&new.profile.phone)
        .bind(&new.profile.application_letter)
        .bind(&new.profile.profile_image)
        .bind(new.role.as_str())
        .fetch_one(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn create_first_admin(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, name, birth_place, birth_date,
                               address, institution, phone, application_letter, profile_image, role)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'admin'
            WHERE NOT EXISTS (SELECT 1 FROM users WHERE role = 'admin')
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(&new.profile.birth_place)
        .bind(&new.profile.birth_date)
        .bind(&new.profile.address)
        .bind(&new.profile.institution)
        .bind(&new.profile.phone)
        .bind(&new.profile.application_letter)
        .bind(&new.profile.profile_image)
        .fetch_optional(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            // A concurrent bootstrap won the race.
            Err(sqlx::Error::Database(db)) if db.constraint() == Some(SINGLE_ADMIN_INDEX) => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("insert first admin")),
        }
    }

    async fn update_profile(&self, id: Uuid, update: ProfileFields) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET name               = COALESCE($2, name),
                   birth_place        = COALESCE($3, birth_place),
                   birth_date         = COALESCE($4, birth_date),
                   address            = COALESCE($5, address),
                   institution        = COALESCE($6, institution),
                   phone              = COALESCE($7, phone),
                   application_letter = COALESCE($8, application_letter),
                   profile_image      = COALESCE($9, profile_image),
                   updated_at         = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.birth_place)
        .bind(update.birth_date)
        .bind(update.address)
        .bind(update.institution)
        .bind(update.phone)
        .bind(update.application_letter)
        .bind(update.profile_image)
        .fetch_optional(&self.db)
        .await
        .context("update profile")?;
        Ok(user)
    }

    async fn set_face_data(&self, id: Uuid, face_data: Option<Vec<f64>>) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"UPDATE users SET face_data = $2, updated_at = now() WHERE id = $1"#,
        )
        .bind(id)
        .bind(face_data.map(Json))
        .execute(&self.db)
        .await
        .context("set face data")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .context("ping database")?;
        Ok(())
    }
}
