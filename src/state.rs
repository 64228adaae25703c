use crate::{
    attendance::repo::{AttendanceRepo, PgAttendanceRepo},
    config::AppConfig,
    notifications::repo::{NotificationRepo, PgNotificationRepo},
    registration::{
        repo::{PgRegistrationCodeRepo, RegistrationCodeRepo},
        service::RegistrationCodeService,
    },
    tasks::repo::{PgTaskRepo, TaskRepo},
    users::repo::{PgUserRepo, UserRepo},
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepo>,
    pub codes: RegistrationCodeService,
    pub attendance: Arc<dyn AttendanceRepo>,
    pub tasks: Arc<dyn TaskRepo>,
    pub notifications: Arc<dyn NotificationRepo>,
}

impl AppState {
    /// Builds the pool without connecting; connections open on first use and
    /// a failed attempt is retried by the next request.
    pub fn connect_lazy(config: &AppConfig) -> anyhow::Result<PgPool> {
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect_lazy(&config.database_url)?;
        Ok(db)
    }

    /// Applies pending migrations. The first query opens the lazy pool, so an
    /// unreachable database fails here instead of on the first request.
    pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(db)
            .await
            .context("run migrations")?;
        Ok(())
    }

    pub fn from_pool(config: Arc<AppConfig>, db: PgPool) -> Self {
        let codes: Arc<dyn RegistrationCodeRepo> = Arc::new(PgRegistrationCodeRepo::new(db.clone()));
        Self {
            config,
            users: Arc::new(PgUserRepo::new(db.clone())),
            codes: RegistrationCodeService::new(codes),
            attendance: Arc::new(PgAttendanceRepo::new(db.clone())),
            tasks: Arc::new(PgTaskRepo::new(db.clone())),
            notifications: Arc::new(PgNotificationRepo::new(db)),
        }
    }

    #[cfg(test)]
    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        codes: Arc<dyn RegistrationCodeRepo>,
        attendance: Arc<dyn AttendanceRepo>,
        tasks: Arc<dyn TaskRepo>,
        notifications: Arc<dyn NotificationRepo>,
    ) -> Self {
        Self {
            config,
            users,
            codes: RegistrationCodeService::new(codes),
            attendance,
            tasks,
            notifications,
        }
    }
}
