use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::hasher::SecretHasher,
};

/// Argon2id with the crate's default parameters, producing PHC-format
/// strings. Used for passwords, reset tokens, and refresh tokens.
#[derive(Clone, Default)]
pub struct Argon2Hasher;

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    fn verify(&self, digest: &str, secret: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
