use std::sync::Arc;

use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use super::{model::RegistrationCode, repo::RegistrationCodeRepo};

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

/// Uniformly random 6-digit code. Nothing is persisted.
pub fn generate() -> String {
    rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Gates self-registration behind a short-lived shared code.
#[derive(Clone)]
pub struct RegistrationCodeService {
    repo: Arc<dyn RegistrationCodeRepo>,
}

impl RegistrationCodeService {
    pub fn new(repo: Arc<dyn RegistrationCodeRepo>) -> Self {
        Self { repo }
    }

    pub async fn current_active(&self, now: OffsetDateTime) -> anyhow::Result<Option<RegistrationCode>> {
        self.repo.latest_active(now).await
    }

    /// `Ok(false)` covers unknown, expired and deactivated codes alike.
    pub async fn validate(&self, code: &str, now: OffsetDateTime) -> anyhow::Result<bool> {
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }
        let candidates = self.repo.find_by_code(code).await?;
        Ok(candidates
            .iter()
            .any(|c| c.code == code && c.is_valid_at(now)))
    }

    /// Deactivates the previous codes and stores a fresh one valid for `ttl`.
    pub async fn issue(
        &self,
        created_by: Option<Uuid>,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> anyhow::Result<RegistrationCode> {
        let deactivated = self.repo.deactivate_all().await?;
        let record = RegistrationCode {
            id: Uuid::new_v4(),
            code: generate(),
            expires_at: now + ttl,
            is_active: true,
            created_by,
            created_at: now,
        };
        self.repo.insert(&record).await?;
        info!(code_id = %record.id, deactivated, expires_at = %record.expires_at, "registration code issued");
        Ok(record)
    }

    pub async fn revoke_current(&self) -> anyhow::Result<u64> {
        let n = self.repo.deactivate_all().await?;
        info!(deactivated = n, "registration codes revoked");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryRegistrationCodeRepo;

    fn record(code: &str, created_at: OffsetDateTime, expires_at: OffsetDateTime, is_active: bool) -> RegistrationCode {
        RegistrationCode {
            id: Uuid::new_v4(),
            code: code.into(),
            expires_at,
            is_active,
            created_by: None,
            created_at,
        }
    }

    fn service_with(codes: Vec<RegistrationCode>) -> RegistrationCodeService {
        RegistrationCodeService::new(Arc::new(MemoryRegistrationCodeRepo::with(codes)))
    }

    #[test]
    fn generate_is_six_digits_in_range() {
        for _ in 0..1000 {
            let code = generate();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((CODE_MIN..=CODE_MAX).contains(&n));
        }
    }

    #[tokio::test]
    async fn validate_requires_active_and_unexpired() {
        let now = OffsetDateTime::now_utc();
        let svc = service_with(vec![
            record("111111", now - Duration::hours(2), now + Duration::hours(1), true),
            record("222222", now - Duration::hours(2), now, true),
            record("333333", now - Duration::hours(2), now - Duration::minutes(1), true),
            record("444444", now - Duration::hours(2), now + Duration::hours(1), false),
        ]);

        assert!(svc.validate("111111", now).await.unwrap());
        assert!(!svc.validate("222222", now).await.unwrap(), "expires_at == now");
        assert!(!svc.validate("333333", now).await.unwrap(), "expired");
        assert!(!svc.validate("444444", now).await.unwrap(), "deactivated");
        assert!(!svc.validate("999999", now).await.unwrap(), "unknown");
        assert!(!svc.validate("11111", now).await.unwrap(), "prefix");
        assert!(!svc.validate(" 111111", now).await.unwrap(), "not exact");
    }

    #[tokio::test]
    async fn current_active_prefers_newest_valid() {
        let now = OffsetDateTime::now_utc();
        let svc = service_with(vec![
            record("111111", now - Duration::hours(3), now + Duration::hours(1), true),
            record("222222", now - Duration::hours(1), now + Duration::hours(1), true),
            record("333333", now - Duration::minutes(5), now + Duration::hours(1), false),
            record("444444", now - Duration::minutes(1), now - Duration::seconds(1), true),
        ]);

        let current = svc.current_active(now).await.unwrap().expect("a valid code");
        assert_eq!(current.code, "222222");
    }

    #[tokio::test]
    async fn current_active_is_none_without_valid_codes() {
        let now = OffsetDateTime::now_utc();
        let svc = service_with(vec![record("111111", now - Duration::hours(3), now, true)]);
        assert!(svc.current_active(now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn issue_replaces_previous_code() {
        let now = OffsetDateTime::now_utc();
        let svc = service_with(vec![record("111111", now - Duration::hours(1), now + Duration::hours(1), true)]);
        let admin = Uuid::new_v4();

        let issued = svc.issue(Some(admin), Duration::minutes(30), now).await.unwrap();
        assert_eq!(issued.created_by, Some(admin));
        assert_eq!(issued.expires_at, now + Duration::minutes(30));
        assert!(!svc.validate("111111", now).await.unwrap() || issued.code == "111111");
        assert!(svc.validate(&issued.code, now).await.unwrap());
        assert_eq!(svc.current_active(now).await.unwrap().unwrap().id, issued.id);

        assert_eq!(svc.revoke_current().await.unwrap(), 1);
        assert!(svc.current_active(now).await.unwrap().is_none());
        assert!(!svc.validate(&issued.code, now).await.unwrap());
    }
}
