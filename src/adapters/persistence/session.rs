use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::session::SessionRepo,
    domain::entities::session::Session,
};

#[derive(sqlx::FromRow, Debug)]
pub struct SessionDb {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
}

impl From<SessionDb> for Session {
    fn from(r: SessionDb) -> Self {
        Session {
            id: r.id,
            user_id: r.user_id,
            device_info: r.device_info,
            ip_address: r.ip_address,
            created_at: r.created_at,
            expires_at: r.expires_at,
            revoked_at: r.revoked_at,
        }
    }
}

const SESSION_COLUMNS: &str =
    "id, user_id, device_info, ip_address, created_at, expires_at, revoked_at";

#[async_trait]
impl SessionRepo for PostgresPersistence {
    async fn create(
        &self,
        user_id: Uuid,
        device_info: Option<&str>,
        ip_address: Option<&str>,
        expires_at: NaiveDateTime,
    ) -> AppResult<Session> {
        let rec = sqlx::query_as::<_, SessionDb>(&format!(
            "INSERT INTO sessions (id, user_id, device_info, ip_address, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(device_info)
        .bind(ip_address)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.into())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        let rec = sqlx::query_as::<_, SessionDb>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.map(Session::from))
    }

    async fn revoke_with_tokens(&self, session_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // The user_id guard keeps one user from revoking another's
        // session; zero rows affected just means nothing to do.
        sqlx::query(
            "UPDATE sessions SET revoked_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = CURRENT_TIMESTAMP
             WHERE session_id = $1 AND user_id = $2 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }
}
