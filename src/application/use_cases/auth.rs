use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use secrecy::SecretString;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::jwt::{self, AccessClaims};
use crate::application::ports::hasher::{SecretHasher, hash_blocking, verify_blocking};
use crate::application::use_cases::session::SessionManager;
use crate::domain::entities::refresh_token::RefreshTokenRecord;
use crate::domain::entities::session::Session;
use crate::domain::entities::user::{User, UserStatus};

/// How many of a family's most recent records are digest-checked when
/// resolving a presented refresh token. Rotation keeps at most one
/// record live per family, so a small window is sufficient.
pub const REFRESH_SCAN_WINDOW: i64 = 5;

pub const DEFAULT_ROLE: &str = "user";

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(
        &self,
        email: &str,
        password_hash: Option<&str>,
        roles: &[String],
    ) -> AppResult<User>;
    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
}

/// A refresh token record about to be persisted.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub family_id: Uuid,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
}

#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn insert(&self, token: NewRefreshToken) -> AppResult<RefreshTokenRecord>;

    /// A family's most recent records, newest first, regardless of
    /// revocation state. Revoked records must be included so that a
    /// replayed token can be told apart from an unknown one.
    async fn recent_for_family(
        &self,
        family_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<RefreshTokenRecord>>;

    /// Revoke-old plus insert-new as one atomic unit. Returns false
    /// without inserting when the old record was already revoked: a
    /// concurrent rotation won the race and the caller must treat the
    /// presented token as reused.
    async fn rotate(&self, old_id: Uuid, new: NewRefreshToken) -> AppResult<bool>;

    /// Bulk-revokes every unrevoked record sharing the family id.
    async fn revoke_family(&self, family_id: Uuid) -> AppResult<()>;
}

// ============================================================================
// Outcomes & Configuration
// ============================================================================

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub session: Session,
    pub user: User,
}

/// Key material and lifetimes for both token kinds. Access and refresh
/// secrets are independent so an access token can never be replayed as
/// a refresh token.
pub struct TokenConfig {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl: time::Duration,
    pub refresh_ttl: time::Duration,
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct AuthUseCases {
    users: Arc<dyn UserRepo>,
    refresh_tokens: Arc<dyn RefreshTokenRepo>,
    sessions: SessionManager,
    hasher: Arc<dyn SecretHasher>,
    tokens: Arc<TokenConfig>,
}

impl AuthUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        refresh_tokens: Arc<dyn RefreshTokenRepo>,
        sessions: SessionManager,
        hasher: Arc<dyn SecretHasher>,
        tokens: Arc<TokenConfig>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            sessions,
            hasher,
            tokens,
        }
    }

    /// Creates a pending account. Activation happens through the email
    /// verification flow; until then login is refused.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        if !crate::application::validators::is_valid_email(&email) {
            return Err(AppError::InvalidInput("Invalid email address".into()));
        }
        if password.len() < 8 {
            return Err(AppError::InvalidInput(
                "Password must be at least 8 characters".into(),
            ));
        }
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AppError::InvalidInput("Email already registered".into()));
        }
        let digest = hash_blocking(self.hasher.clone(), password.to_string()).await?;
        self.users
            .create(&email, Some(&digest), &[DEFAULT_ROLE.to_string()])
            .await
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<&str>,
        ip_address: Option<&str>,
    ) -> AppResult<LoginOutcome> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        // Accounts without a stored digest authenticate elsewhere and
        // cannot log in with a password.
        let Some(digest) = user.password_hash.clone() else {
            return Err(AppError::InvalidCredentials);
        };
        if !verify_blocking(self.hasher.clone(), digest, password.to_string()).await? {
            return Err(AppError::InvalidCredentials);
        }

        match user.status {
            UserStatus::Banned => return Err(AppError::AccountBanned),
            UserStatus::Pending => return Err(AppError::AccountNotActive),
            UserStatus::Active => {}
        }

        let session = self
            .sessions
            .create_session(user.id, device_info, ip_address, self.tokens.refresh_ttl)
            .await?;

        let family_id = Uuid::new_v4();
        let pair = self.issue_pair(&user, session.id, family_id)?;

        let token_hash = hash_blocking(self.hasher.clone(), pair.refresh_token.clone()).await?;
        self.refresh_tokens
            .insert(new_record(
                user.id,
                session.id,
                family_id,
                token_hash,
                session.expires_at,
            ))
            .await?;

        Ok(LoginOutcome {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            session,
            user,
        })
    }

    /// Exchanges a live refresh token for a fresh access/refresh pair.
    ///
    /// Presenting a token that is absent from, or already revoked in,
    /// its family is treated as proof of replay: the whole family is
    /// revoked before `TokenReuseDetected` is surfaced. A concurrent
    /// rotation race resolves the same way for the loser.
    #[instrument(skip(self, presented))]
    pub async fn rotate(&self, presented: &str) -> AppResult<TokenPair> {
        let claims = jwt::verify_refresh(presented, &self.tokens.refresh_secret)?;
        let family_id: Uuid = claims.fam.parse().map_err(|_| AppError::InvalidToken)?;
        let user_id: Uuid = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

        let recent = self
            .refresh_tokens
            .recent_for_family(family_id, REFRESH_SCAN_WINDOW)
            .await?;

        let mut matched = None;
        for candidate in &recent {
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

        let record = match matched {
            Some(record) if !record.is_revoked() => record,
            // Unknown or already-rotated-away token: a race is
            // indistinguishable from an attack and handled identically.
            _ => return Err(self.detect_reuse(family_id, user_id).await),
        };

        let now = chrono::Utc::now().naive_utc();
        if record.is_expired(now) {
            return Err(AppError::TokenExpired);
        }

        let session = self
            .sessions
            .get_session(record.session_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !session.is_live(now) {
            return Err(AppError::InvalidToken);
        }

        let user = self
            .users
            .get_by_id(record.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if user.status == UserStatus::Banned {
            return Err(AppError::AccountBanned);
        }

        let pair = self.issue_pair(&user, record.session_id, family_id)?;
        let token_hash = hash_blocking(self.hasher.clone(), pair.refresh_token.clone()).await?;
        let replacement = new_record(
            user.id,
            record.session_id,
            family_id,
            token_hash,
            session.expires_at,
        );

        if !self.refresh_tokens.rotate(record.id, replacement).await? {
            return Err(self.detect_reuse(family_id, user_id).await);
        }

        Ok(pair)
    }

    /// Revokes the session and its refresh tokens. Idempotent.
    #[instrument(skip(self))]
    pub async fn logout(&self, user_id: Uuid, session_id: Uuid) -> AppResult<()> {
        self.sessions.revoke_session(session_id, user_id).await
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        jwt::verify_access(token, &self.tokens.access_secret)
    }

    fn issue_pair(&self, user: &User, session_id: Uuid, family_id: Uuid) -> AppResult<TokenPair> {
        let access_token = jwt::issue_access(
            user.id,
            session_id,
            user.roles.clone(),
            &self.tokens.access_secret,
            self.tokens.access_ttl,
        )?;
        let refresh_token = jwt::issue_refresh(
            user.id,
            session_id,
            family_id,
            &self.tokens.refresh_secret,
            self.tokens.refresh_ttl,
        )?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn detect_reuse(&self, family_id: Uuid, user_id: Uuid) -> AppError {
        warn!(%family_id, %user_id, "refresh token reuse detected, revoking family");
        if let Err(err) = self.refresh_tokens.revoke_family(family_id).await {
            return err;
        }
        AppError::TokenReuseDetected
    }
}

/// Records expire with their session: a session must outlive or equal
/// every refresh token minted under it, so the store expiry is pinned
/// to the session's rather than recomputed from the TTL.
fn new_record(
    user_id: Uuid,
    session_id: Uuid,
    family_id: Uuid,
    token_hash: String,
    expires_at: NaiveDateTime,
) -> NewRefreshToken {
    NewRefreshToken {
        id: Uuid::new_v4(),
        user_id,
        session_id,
        family_id,
        token_hash,
        expires_at,
    }
}
