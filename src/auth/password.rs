use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

use crate::error::{AppError, AppResult};

lazy_static! {
    // Stands in for the stored hash of an unknown account.
    static ref DUMMY_HASH: Option<String> = hash_password("timing-equalizer").ok();
}

fn internal(context: &'static str, e: argon2::password_hash::Error) -> AppError {
    error!(error = %e, "{context}");
    AppError::Internal(anyhow::anyhow!("{context}: {e}"))
}

/// Salted Argon2id PHC string for storage in `users.password_hash`.
pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| internal("password hashing failed", e))
}

/// Checks `plain` against an account's stored hash.
///
/// With no account (`None`) the password is still run through Argon2 against
/// a throwaway hash and the result is always `false`, so an unknown email
/// costs the same as a wrong password.
pub fn check_credentials(plain: &str, stored: Option<&str>) -> AppResult<bool> {
    let Some(stored) = stored else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = matches(plain, dummy);
        }
        return Ok(false);
    };
    matches(plain, stored)
}

fn matches(plain: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| internal("stored password hash is corrupt", e))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
