use std::sync::Arc;

use crate::app_error::{AppError, AppResult};

/// One-way hash and verify for long-lived secrets: passwords, reset
/// tokens, and refresh tokens. Implementations must be memory-hard;
/// the short-lived email OTPs use a fast hash instead and do not go
/// through this port.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> AppResult<String>;

    /// Returns false for a mismatch or an unparseable digest.
    fn verify(&self, digest: &str, secret: &str) -> bool;
}

/// Runs the memory-hard hash on the blocking pool so async worker
/// threads stay available for request traffic.
pub async fn hash_blocking(hasher: Arc<dyn SecretHasher>, secret: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&secret))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
}

pub async fn verify_blocking(
    hasher: Arc<dyn SecretHasher>,
    digest: String,
    secret: String,
) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&digest, &secret))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}
