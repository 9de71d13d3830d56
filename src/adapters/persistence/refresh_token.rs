use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::auth::{NewRefreshToken, RefreshTokenRepo},
    domain::entities::refresh_token::RefreshTokenRecord,
};

#[derive(sqlx::FromRow, Debug)]
pub struct RefreshTokenDb {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub family_id: Uuid,
    pub token_hash: String,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub replaced_by: Option<Uuid>,
}

impl From<RefreshTokenDb> for RefreshTokenRecord {
    fn from(r: RefreshTokenDb) -> Self {
        RefreshTokenRecord {
            id: r.id,
            user_id: r.user_id,
            session_id: r.session_id,
            family_id: r.family_id,
            token_hash: r.token_hash,
            created_at: r.created_at,
            expires_at: r.expires_at,
            revoked_at: r.revoked_at,
            replaced_by: r.replaced_by,
        }
    }
}

const TOKEN_COLUMNS: &str = "id, user_id, session_id, family_id, token_hash, \
                             created_at, expires_at, revoked_at, replaced_by";

#[async_trait]
impl RefreshTokenRepo for PostgresPersistence {
    async fn insert(&self, token: NewRefreshToken) -> AppResult<RefreshTokenRecord> {
        let rec = sqlx::query_as::<_, RefreshTokenDb>(&format!(
            "INSERT INTO refresh_tokens
                 (id, user_id, session_id, family_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(token.id)
        .bind(token.user_id)
        .bind(token.session_id)
        .bind(token.family_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.into())
    }

    async fn recent_for_family(
        &self,
        family_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<RefreshTokenRecord>> {
        let recs = sqlx::query_as::<_, RefreshTokenDb>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens
             WHERE family_id = $1
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(family_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(recs.into_iter().map(RefreshTokenRecord::from).collect())
    }

    async fn rotate(&self, old_id: Uuid, new: NewRefreshToken) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // The revoked_at guard is the race arbiter: exactly one of two
        // concurrent rotations of the same record can flip it.
        let updated = sqlx::query(
            "UPDATE refresh_tokens
             SET revoked_at = CURRENT_TIMESTAMP, replaced_by = $2
             WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(old_id)
        .bind(new.id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens
                 (id, user_id, session_id, family_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(new.id)
        .bind(new.user_id)
        .bind(new.session_id)
        .bind(new.family_id)
        .bind(&new.token_hash)
        .bind(new.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(true)
    }

    async fn revoke_family(&self, family_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = CURRENT_TIMESTAMP
             WHERE family_id = $1 AND revoked_at IS NULL",
        )
        .bind(family_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
