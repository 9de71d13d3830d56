use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::notifier::EmailSender;
use crate::application::use_cases::auth::UserRepo;
use crate::domain::entities::email_otp::EmailVerificationToken;
use crate::domain::entities::user::User;

#[derive(Debug)]
pub struct OtpIssued {
    pub user_id: Uuid,
    pub expires_at: NaiveDateTime,
}

#[async_trait]
pub trait EmailOtpRepo: Send + Sync {
    /// Expires every live code the user holds, so only the latest one
    /// can be confirmed.
    async fn invalidate_live_for_user(&self, user_id: Uuid) -> AppResult<()>;

    async fn insert(
        &self,
        user_id: Uuid,
        otp_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<EmailVerificationToken>;

    async fn latest_live_for_user(&self, user_id: Uuid)
    -> AppResult<Option<EmailVerificationToken>>;

    /// Atomically consumes the code and flips the account to active.
    async fn consume_and_activate(&self, token_id: Uuid, user_id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct EmailVerificationUseCases {
    users: Arc<dyn UserRepo>,
    otps: Arc<dyn EmailOtpRepo>,
    email: Arc<dyn EmailSender>,
    otp_ttl: time::Duration,
}

impl EmailVerificationUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        otps: Arc<dyn EmailOtpRepo>,
        email: Arc<dyn EmailSender>,
        otp_ttl: time::Duration,
    ) -> Self {
        Self {
            users,
            otps,
            email,
            otp_ttl,
        }
    }

    /// Issues a 6-digit code and emails it. Earlier live codes for the
    /// user are invalidated first.
    #[instrument(skip(self))]
    pub async fn request_otp(&self, email: &str) -> AppResult<OtpIssued> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AppError::NotFound)?;

        self.otps.invalidate_live_for_user(user.id).await?;

        let code = generate_otp();
        let expires_at = chrono::Utc::now().naive_utc()
            + chrono::Duration::seconds(self.otp_ttl.whole_seconds());
        self.otps
            .insert(user.id, &hash_otp(&code), expires_at)
            .await?;

        let html = format!(
            "<p>Your verification code is:</p><h2>{code}</h2>\
             <p>It expires in {} minutes.</p>",
            self.otp_ttl.whole_minutes()
        );
        if let Err(err) = self.email.send(&user.email, "Verify your email", &html).await {
            warn!(user_id = %user.id, error = %err, "failed to send verification email");
        }

        Ok(OtpIssued {
            user_id: user.id,
            expires_at,
        })
    }

    /// Confirms the latest live code for the account and activates it.
    /// Already-active accounts may still confirm; activation is
    /// idempotent.
    #[instrument(skip(self, code))]
    pub async fn confirm_otp(&self, user_id: Uuid, code: &str) -> AppResult<User> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let token = self
            .otps
            .latest_live_for_user(user.id)
            .await?
            .ok_or(AppError::OtpNotFound)?;

        if !constant_time_eq(token.otp_hash.as_bytes(), hash_otp(code).as_bytes()) {
            return Err(AppError::InvalidOtp);
        }

        self.otps.consume_and_activate(token.id, user.id).await?;
        self.users
            .get_by_id(user.id)
            .await?
            .ok_or(AppError::NotFound)
    }
}

fn generate_otp() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Codes are low-entropy and short-lived, so a fast hash is enough.
pub fn hash_otp(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
