use chrono::NaiveDateTime;
use uuid::Uuid;

/// One authenticated device/browser context. Expiry matches the
/// refresh-token lifetime so rotation stays valid for the session's
/// whole life.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
}

impl Session {
    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}
