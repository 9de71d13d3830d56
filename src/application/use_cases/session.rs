use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::AppResult;
use crate::domain::entities::session::Session;

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        device_info: Option<&str>,
        ip_address: Option<&str>,
        expires_at: NaiveDateTime,
    ) -> AppResult<Session>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Session>>;

    /// Atomically sets the revocation time on the session and on all of
    /// its unrevoked refresh tokens. No-op when the session is already
    /// revoked, missing, or owned by a different user.
    async fn revoke_with_tokens(&self, session_id: Uuid, user_id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SessionManager {
    repo: Arc<dyn SessionRepo>,
}

impl SessionManager {
    pub fn new(repo: Arc<dyn SessionRepo>) -> Self {
        Self { repo }
    }

    /// Creates a session expiring at now + ttl. The ttl is the
    /// refresh-token lifetime: a session must outlive or equal its
    /// refresh token so rotation remains valid.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        user_id: Uuid,
        device_info: Option<&str>,
        ip_address: Option<&str>,
        ttl: time::Duration,
    ) -> AppResult<Session> {
        let expires_at =
            chrono::Utc::now().naive_utc() + chrono::Duration::seconds(ttl.whole_seconds());
        self.repo
            .create(user_id, device_info, ip_address, expires_at)
            .await
    }

    pub async fn get_session(&self, id: Uuid) -> AppResult<Option<Session>> {
        self.repo.get_by_id(id).await
    }

    /// Logout must be idempotent: revoking an already-revoked or unknown
    /// session is not an error.
    #[instrument(skip(self))]
    pub async fn revoke_session(&self, session_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.repo.revoke_with_tokens(session_id, user_id).await
    }
}
