use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::notifier::EmailSender,
    application::use_cases::{
        auth::{NewRefreshToken, RefreshTokenRepo, UserRepo},
        email_verification::EmailOtpRepo,
        password_reset::ResetTokenRepo,
        session::SessionRepo,
    },
    domain::entities::{
        email_otp::EmailVerificationToken, refresh_token::RefreshTokenRecord,
        reset_token::PasswordResetToken, session::Session,
        user::{User, UserStatus},
    },
};

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[derive(Default)]
struct StoreInner {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    // Insertion order doubles as recency, newest last.
    refresh_tokens: Vec<RefreshTokenRecord>,
    reset_tokens: Vec<PasswordResetToken>,
    otps: Vec<EmailVerificationToken>,
}

/// Every repository trait on one struct behind one lock, mirroring the
/// production persistence where all traits land on the same pool. The
/// single lock makes the multi-entity operations trivially atomic.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.inner.lock().unwrap().users.get(&id).cloned()
    }

    pub fn session(&self, id: Uuid) -> Option<Session> {
        self.inner.lock().unwrap().sessions.get(&id).cloned()
    }

    pub fn refresh_records_for_user(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.inner
            .lock()
            .unwrap()
            .refresh_tokens
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn refresh_records_for_family(&self, family_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.inner
            .lock()
            .unwrap()
            .refresh_tokens
            .iter()
            .filter(|r| r.family_id == family_id)
            .cloned()
            .collect()
    }

    pub fn live_reset_tokens_for_user(&self, user_id: Uuid) -> Vec<PasswordResetToken> {
        let at = now();
        self.inner
            .lock()
            .unwrap()
            .reset_tokens
            .iter()
            .filter(|t| t.user_id == user_id && t.is_live(at))
            .cloned()
            .collect()
    }

    pub fn set_user_status(&self, id: Uuid, status: UserStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.get_mut(&id) {
            user.status = status;
        }
    }

    pub fn set_session_expiry(&self, id: Uuid, expires_at: NaiveDateTime) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(session) = inner.sessions.get_mut(&id) {
            session.expires_at = expires_at;
        }
    }

    pub fn seed_user(
        &self,
        email: &str,
        password_hash: Option<&str>,
        status: UserStatus,
    ) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.map(|s| s.to_string()),
            status,
            roles: vec!["user".to_string()],
            created_at: Some(now()),
            updated_at: Some(now()),
        };
        self.inner
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
        user
    }

    pub fn seed_refresh_record(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        family_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> RefreshTokenRecord {
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            family_id,
            token_hash: token_hash.to_string(),
            created_at: Some(now()),
            expires_at,
            revoked_at: None,
            replaced_by: None,
        };
        self.inner
            .lock()
            .unwrap()
            .refresh_tokens
            .push(record.clone());
        record
    }

    pub fn seed_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> PasswordResetToken {
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            created_at: Some(now()),
            expires_at,
            consumed_at: None,
        };
        self.inner
            .lock()
            .unwrap()
            .reset_tokens
            .push(token.clone());
        token
    }

    pub fn seed_otp(
        &self,
        user_id: Uuid,
        otp_hash: &str,
        expires_at: NaiveDateTime,
    ) -> EmailVerificationToken {
        let token = EmailVerificationToken {
            id: Uuid::new_v4(),
            user_id,
            otp_hash: otp_hash.to_string(),
            created_at: Some(now()),
            expires_at,
            consumed_at: None,
        };
        self.inner.lock().unwrap().otps.push(token.clone());
        token
    }
}

#[async_trait]
impl UserRepo for InMemoryStore {
    async fn create(
        &self,
        email: &str,
        password_hash: Option<&str>,
        roles: &[String],
    ) -> AppResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.values().any(|u| u.email == email) {
            return Err(AppError::InvalidInput(
                "A record with this value already exists".into(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.map(|s| s.to_string()),
            status: UserStatus::Pending,
            roles: roles.to_vec(),
            created_at: Some(now()),
            updated_at: Some(now()),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }
}

#[async_trait]
impl SessionRepo for InMemoryStore {
    async fn create(
        &self,
        user_id: Uuid,
        device_info: Option<&str>,
        ip_address: Option<&str>,
        expires_at: NaiveDateTime,
    ) -> AppResult<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            device_info: device_info.map(|s| s.to_string()),
            ip_address: ip_address.map(|s| s.to_string()),
            created_at: Some(now()),
            expires_at,
            revoked_at: None,
        };
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        Ok(self.inner.lock().unwrap().sessions.get(&id).cloned())
    }

    async fn revoke_with_tokens(&self, session_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let at = now();
        if let Some(session) = inner.sessions.get_mut(&session_id) {
            if session.user_id == user_id && session.revoked_at.is_none() {
                session.revoked_at = Some(at);
            }
        }
        for record in inner
            .refresh_tokens
            .iter_mut()
            .filter(|r| r.session_id == session_id && r.user_id == user_id)
        {
            record.revoked_at.get_or_insert(at);
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepo for InMemoryStore {
    async fn insert(&self, token: NewRefreshToken) -> AppResult<RefreshTokenRecord> {
        let record = RefreshTokenRecord {
            id: token.id,
            user_id: token.user_id,
            session_id: token.session_id,
            family_id: token.family_id,
            token_hash: token.token_hash,
            created_at: Some(now()),
            expires_at: token.expires_at,
            revoked_at: None,
            replaced_by: None,
        };
        self.inner
            .lock()
            .unwrap()
            .refresh_tokens
            .push(record.clone());
        Ok(record)
    }

    async fn recent_for_family(
        &self,
        family_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<RefreshTokenRecord>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .refresh_tokens
            .iter()
            .rev()
            .filter(|r| r.family_id == family_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn rotate(&self, old_id: Uuid, new: NewRefreshToken) -> AppResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(old) = inner
            .refresh_tokens
            .iter_mut()
            .find(|r| r.id == old_id)
        else {
            return Ok(false);
        };
        if old.revoked_at.is_some() {
            return Ok(false);
        }
        old.revoked_at = Some(now());
        old.replaced_by = Some(new.id);
        let record = RefreshTokenRecord {
            id: new.id,
            user_id: new.user_id,
            session_id: new.session_id,
            family_id: new.family_id,
            token_hash: new.token_hash,
            created_at: Some(now()),
            expires_at: new.expires_at,
            revoked_at: None,
            replaced_by: None,
        };
        inner.refresh_tokens.push(record);
        Ok(true)
    }

    async fn revoke_family(&self, family_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let at = now();
        for record in inner
            .refresh_tokens
            .iter_mut()
            .filter(|r| r.family_id == family_id)
        {
            record.revoked_at.get_or_insert(at);
        }
        Ok(())
    }
}

#[async_trait]
impl ResetTokenRepo for InMemoryStore {
    async fn invalidate_live_for_user(&self, user_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let at = now();
        for token in inner
            .reset_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.consumed_at.is_none() && t.expires_at > at)
        {
            token.expires_at = at;
        }
        Ok(())
    }

    async fn insert(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<PasswordResetToken> {
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            created_at: Some(now()),
            expires_at,
            consumed_at: None,
        };
        self.inner
            .lock()
            .unwrap()
            .reset_tokens
            .push(token.clone());
        Ok(token)
    }

    async fn live_candidates(&self, limit: i64) -> AppResult<Vec<PasswordResetToken>> {
        let at = now();
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reset_tokens
            .iter()
            .rev()
            .filter(|t| t.is_live(at))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn consume_and_set_password(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
    ) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let at = now();
        let token = inner
            .reset_tokens
            .iter_mut()
            .find(|t| t.id == token_id)
            .ok_or(AppError::InvalidOrExpiredToken)?;
        if !token.is_live(at) {
            return Err(AppError::InvalidOrExpiredToken);
        }
        token.consumed_at = Some(at);
        for sibling in inner
            .reset_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.consumed_at.is_none() && t.expires_at > at)
        {
            sibling.expires_at = at;
        }
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.password_hash = Some(password_hash.to_string());
            user.updated_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl EmailOtpRepo for InMemoryStore {
    async fn invalidate_live_for_user(&self, user_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let at = now();
        for token in inner
            .otps
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.consumed_at.is_none() && t.expires_at > at)
        {
            token.expires_at = at;
        }
        Ok(())
    }

    async fn insert(
        &self,
        user_id: Uuid,
        otp_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<EmailVerificationToken> {
        let token = EmailVerificationToken {
            id: Uuid::new_v4(),
            user_id,
            otp_hash: otp_hash.to_string(),
            created_at: Some(now()),
            expires_at,
            consumed_at: None,
        };
        self.inner.lock().unwrap().otps.push(token.clone());
        Ok(token)
    }

    async fn latest_live_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<EmailVerificationToken>> {
        let at = now();
        Ok(self
            .inner
            .lock()
            .unwrap()
            .otps
            .iter()
            .rev()
            .find(|t| t.user_id == user_id && t.is_live(at))
            .cloned())
    }

    async fn consume_and_activate(&self, token_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let at = now();
        let token = inner
            .otps
            .iter_mut()
            .find(|t| t.id == token_id)
            .ok_or(AppError::OtpNotFound)?;
        if !token.is_live(at) {
            return Err(AppError::OtpNotFound);
        }
        token.consumed_at = Some(at);
        if let Some(user) = inner.users.get_mut(&user_id) {
            if user.status == UserStatus::Pending {
                user.status = UserStatus::Active;
                user.updated_at = Some(at);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Captures outgoing mail instead of sending it.
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<SentEmail> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Fails every send, for exercising delivery-failure paths.
pub struct FailingEmailSender;

#[async_trait]
impl EmailSender for FailingEmailSender {
    async fn send(&self, _to: &str, _subject: &str, _html: &str) -> AppResult<()> {
        Err(AppError::Internal("email delivery failed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_token(user_id: Uuid, session_id: Uuid, family_id: Uuid) -> NewRefreshToken {
        NewRefreshToken {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            family_id,
            token_hash: "digest".to_string(),
            expires_at: now() + chrono::Duration::days(30),
        }
    }

    #[tokio::test]
    async fn rotate_arbitrates_the_race() {
        let store = InMemoryStore::new();
        let (user_id, session_id, family_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let record = RefreshTokenRepo::insert(&store, new_token(user_id, session_id, family_id))
            .await
            .unwrap();

        // First rotation wins, second loses without inserting.
        assert!(store
            .rotate(record.id, new_token(user_id, session_id, family_id))
            .await
            .unwrap());
        assert!(!store
            .rotate(record.id, new_token(user_id, session_id, family_id))
            .await
            .unwrap());

        let records = store.refresh_records_for_family(family_id);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn recent_for_family_is_newest_first_and_bounded() {
        let store = InMemoryStore::new();
        let (user_id, session_id, family_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut last_id = Uuid::nil();
        for _ in 0..7 {
            let token = new_token(user_id, session_id, family_id);
            last_id = token.id;
            RefreshTokenRepo::insert(&store, token).await.unwrap();
        }

        let recent = store.recent_for_family(family_id, 5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].id, last_id);
    }
}
