use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::password_reset::ResetTokenRepo,
    domain::entities::reset_token::PasswordResetToken,
};

#[derive(sqlx::FromRow, Debug)]
pub struct PasswordResetTokenDb {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: NaiveDateTime,
    pub consumed_at: Option<NaiveDateTime>,
}

impl From<PasswordResetTokenDb> for PasswordResetToken {
    fn from(r: PasswordResetTokenDb) -> Self {
        PasswordResetToken {
            id: r.id,
            user_id: r.user_id,
            token_hash: r.token_hash,
            created_at: r.created_at,
            expires_at: r.expires_at,
            consumed_at: r.consumed_at,
        }
    }
}

const RESET_COLUMNS: &str = "id, user_id, token_hash, created_at, expires_at, consumed_at";

#[async_trait]
impl ResetTokenRepo for PostgresPersistence {
    async fn invalidate_live_for_user(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE password_reset_tokens SET expires_at = CURRENT_TIMESTAMP
             WHERE user_id = $1 AND consumed_at IS NULL AND expires_at > CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn insert(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<PasswordResetToken> {
        let rec = sqlx::query_as::<_, PasswordResetTokenDb>(&format!(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {RESET_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.into())
    }

    async fn live_candidates(&self, limit: i64) -> AppResult<Vec<PasswordResetToken>> {
        let recs = sqlx::query_as::<_, PasswordResetTokenDb>(&format!(
            "SELECT {RESET_COLUMNS} FROM password_reset_tokens
             WHERE consumed_at IS NULL AND expires_at > CURRENT_TIMESTAMP
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(recs.into_iter().map(PasswordResetToken::from).collect())
    }

    async fn consume_and_set_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // Consuming is the race arbiter; a second attempt with the same
        // token sees zero rows and fails before touching the password.
        let consumed = sqlx::query(
            "UPDATE password_reset_tokens SET consumed_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND consumed_at IS NULL AND expires_at > CURRENT_TIMESTAMP",
        )
        .bind(token_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
        if consumed.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::from)?;
            return Err(AppError::InvalidOrExpiredToken);
        }

        sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        // Siblings issued before this reset are dead letters now.
        sqlx::query(
            "UPDATE password_reset_tokens SET expires_at = CURRENT_TIMESTAMP
             WHERE user_id = $1 AND consumed_at IS NULL AND expires_at > CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }
}
