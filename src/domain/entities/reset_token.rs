use chrono::NaiveDateTime;
use uuid::Uuid;

/// Single-use password-reset token. Only the Argon2 digest of the raw
/// secret is stored; the raw value exists solely in the reset email.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: NaiveDateTime,
    pub consumed_at: Option<NaiveDateTime>,
}

impl PasswordResetToken {
    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}
