use chrono::NaiveDateTime;
use uuid::Uuid;

/// Single-use 6-digit email-verification code, stored as a SHA-256
/// hex digest. Short-lived and low-entropy by design.
#[derive(Debug, Clone)]
pub struct EmailVerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub otp_hash: String,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: NaiveDateTime,
    pub consumed_at: Option<NaiveDateTime>,
}

impl EmailVerificationToken {
    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}
