use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::email_verification::EmailOtpRepo,
    domain::entities::email_otp::EmailVerificationToken,
    domain::entities::user::UserStatus,
};

#[derive(sqlx::FromRow, Debug)]
pub struct EmailVerificationTokenDb {
    pub id: Uuid,
    pub user_id: Uuid,
    pub otp_hash: String,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: NaiveDateTime,
    pub consumed_at: Option<NaiveDateTime>,
}

impl From<EmailVerificationTokenDb> for EmailVerificationToken {
    fn from(r: EmailVerificationTokenDb) -> Self {
        EmailVerificationToken {
            id: r.id,
            user_id: r.user_id,
            otp_hash: r.otp_hash,
            created_at: r.created_at,
            expires_at: r.expires_at,
            consumed_at: r.consumed_at,
        }
    }
}

const OTP_COLUMNS: &str = "id, user_id, otp_hash, created_at, expires_at, consumed_at";

#[async_trait]
impl EmailOtpRepo for PostgresPersistence {
    async fn invalidate_live_for_user(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE email_verification_tokens SET expires_at = CURRENT_TIMESTAMP
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
        otp_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<EmailVerificationToken> {
        let rec = sqlx::query_as::<_, EmailVerificationTokenDb>(&format!(
            "INSERT INTO email_verification_tokens (id, user_id, otp_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING {OTP_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(otp_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.into())
    }

    async fn latest_live_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<EmailVerificationToken>> {
        let rec = sqlx::query_as::<_, EmailVerificationTokenDb>(&format!(
            "SELECT {OTP_COLUMNS} FROM email_verification_tokens
             WHERE user_id = $1 AND consumed_at IS NULL AND expires_at > CURRENT_TIMESTAMP
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rec.map(EmailVerificationToken::from))
    }

    async fn consume_and_activate(&self, token_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let consumed = sqlx::query(
            "UPDATE email_verification_tokens SET consumed_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND consumed_at IS NULL AND expires_at > CURRENT_TIMESTAMP",
        )
        .bind(token_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;
        if consumed.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::from)?;
            return Err(AppError::OtpNotFound);
        }

        // Banned stays banned; only pending accounts flip to active.
        sqlx::query(
            "UPDATE users SET status = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND status = $3",
        )
        .bind(user_id)
        .bind(UserStatus::Active.as_str())
        .bind(UserStatus::Pending.as_str())
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }
}
