use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

// ============================================================================
// Access Tokens
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    /// Session id the token was minted under.
    pub sid: String,
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub fn issue_access(
    user_id: Uuid,
    session_id: Uuid,
    roles: Vec<String>,
    secret: &secrecy::SecretString,
    ttl: Duration,
) -> AppResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        roles,
        iat: now,
        exp: now + ttl.whole_seconds(),
        jti: Uuid::new_v4().to_string(),
    };
    let header = Header::new(Algorithm::HS256);
    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_access(token: &str, secret: &secrecy::SecretString) -> AppResult<AccessClaims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(map_verify_error)
}

// ============================================================================
// Refresh Tokens
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub sid: String,
    /// Token family id, shared by every token descended from one login.
    pub fam: String,
    pub exp: i64,
    pub iat: i64,
    /// Unique per issued token, so two rotations within the same second
    /// never produce byte-identical tokens.
    pub jti: String,
}

pub fn issue_refresh(
    user_id: Uuid,
    session_id: Uuid,
    family_id: Uuid,
    secret: &secrecy::SecretString,
    ttl: Duration,
) -> AppResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        fam: family_id.to_string(),
        iat: now,
        exp: now + ttl.whole_seconds(),
        jti: Uuid::new_v4().to_string(),
    };
    let header = Header::new(Algorithm::HS256);
    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_refresh(token: &str, secret: &secrecy::SecretString) -> AppResult<RefreshClaims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(map_verify_error)
}

fn map_verify_error(err: jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    }
}
