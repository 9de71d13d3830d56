use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::NaiveDateTime;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::hasher::{SecretHasher, hash_blocking, verify_blocking};
use crate::application::ports::notifier::EmailSender;
use crate::application::use_cases::auth::UserRepo;
use crate::domain::entities::reset_token::PasswordResetToken;

/// Upper bound on live reset tokens digest-checked per attempt.
/// Requesting a reset invalidates the user's earlier tokens, so in
/// practice at most one candidate per user is live at a time.
pub const RESET_SCAN_LIMIT: i64 = 50;

const RESET_SECRET_BYTES: usize = 32;

#[async_trait]
pub trait ResetTokenRepo: Send + Sync {
    /// Expires every unconsumed, unexpired token the user holds.
    async fn invalidate_live_for_user(&self, user_id: Uuid) -> AppResult<()>;

    async fn insert(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<PasswordResetToken>;

    /// Unconsumed, unexpired tokens across all users, newest first.
    async fn live_candidates(&self, limit: i64) -> AppResult<Vec<PasswordResetToken>>;

    /// Atomically consumes the token, writes the user's new password
    /// digest, and invalidates the user's other live reset tokens.
    async fn consume_and_set_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
    ) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PasswordResetUseCases {
    users: Arc<dyn UserRepo>,
    tokens: Arc<dyn ResetTokenRepo>,
    hasher: Arc<dyn SecretHasher>,
    email: Arc<dyn EmailSender>,
    app_origin: String,
    reset_ttl: time::Duration,
}

impl PasswordResetUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        tokens: Arc<dyn ResetTokenRepo>,
        hasher: Arc<dyn SecretHasher>,
        email: Arc<dyn EmailSender>,
        app_origin: String,
        reset_ttl: time::Duration,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            email,
            app_origin,
            reset_ttl,
        }
    }

    /// Issues a fresh single-use reset token and emails the raw secret.
    /// Any previous live token for the user is invalidated first, so
    /// only the most recently requested link works.
    #[instrument(skip(self))]
    pub async fn request_reset(&self, email: &str) -> AppResult<()> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AppError::NotFound)?;

        self.tokens.invalidate_live_for_user(user.id).await?;

        let secret = generate_reset_secret();
        let digest = hash_blocking(self.hasher.clone(), secret.clone()).await?;
        let expires_at = chrono::Utc::now().naive_utc()
            + chrono::Duration::seconds(self.reset_ttl.whole_seconds());
        self.tokens.insert(user.id, &digest, expires_at).await?;

        let link = format!("{}/reset-password?token={}", self.app_origin, secret);
        let html = format!(
            "<p>A password reset was requested for your account.</p>\
             <p><a href=\"{link}\">Reset your password</a></p>\
             <p>The link expires in {} minutes. If you did not request \
             this, you can ignore this email.</p>",
            self.reset_ttl.whole_minutes()
        );
        // The token is already committed; a delivery failure must not
        // undo it or leak as an error to the requester.
        if let Err(err) = self.email.send(&user.email, "Reset your password", &html).await {
            warn!(user_id = %user.id, error = %err, "failed to send password reset email");
        }
        Ok(())
    }

    /// Consumes a reset token and sets the new password. The presented
    /// secret is resolved by digest-checking live candidates; a miss is
    /// indistinguishable from an expired or consumed token.
    #[instrument(skip(self, presented, new_password))]
    pub async fn complete_reset(&self, presented: &str, new_password: &str) -> AppResult<()> {
        let candidates = self.tokens.live_candidates(RESET_SCAN_LIMIT).await?;
        let mut matched = None;
        for candidate in &candidates {
            let hit = verify_blocking(
                self.hasher.clone(),
                candidate.token_hash.clone(),
                presented.to_string(),
            )
            .await?;
            if hit {
                matched = Some(candidate);
                break;
            }
        }
        let matched = matched.ok_or(AppError::InvalidOrExpiredToken)?;

        let password_hash = hash_blocking(self.hasher.clone(), new_password.to_string()).await?;
        self.tokens
            .consume_and_set_password(matched.id, matched.user_id, &password_hash)
            .await
    }
}

fn generate_reset_secret() -> String {
    let mut bytes = [0u8; RESET_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
