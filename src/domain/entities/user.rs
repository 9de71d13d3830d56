use uuid::Uuid;

/// Account lifecycle: `Pending` until the email OTP is confirmed, then
/// `Active`. Only `Active` users may complete a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Pending,
    Active,
    Banned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Banned => "banned",
        }
    }

    /// `None` for an unrecognized status string; callers decide how to
    /// surface the bad data.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(UserStatus::Pending),
            "active" => Some(UserStatus::Active),
            "banned" => Some(UserStatus::Banned),
            _ => None,
        }
    }
}


#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// PHC-formatted Argon2id digest. `None` for accounts that
    /// authenticate externally and never set a password.
    pub password_hash: Option<String>,
    pub status: UserStatus,
    pub roles: Vec<String>,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}
