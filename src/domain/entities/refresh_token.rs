use chrono::NaiveDateTime;
use uuid::Uuid;

/// One issued refresh credential. `family_id` is a flat lineage tag
/// shared by every record descended from one login; the whole family
/// is revoked together when reuse is detected. Only the Argon2 digest
/// of the signed token is stored.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
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

impl RefreshTokenRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at <= now
    }
}
