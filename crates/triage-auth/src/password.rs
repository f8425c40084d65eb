//! # Password Hashing
//!
//! Argon2id hashing and verification for principal passwords.
//!
//! - Hashing uses Argon2id (hybrid mode) with default parameters and a
//!   salt from `OsRng`.
//! - Stored values are PHC strings (`$argon2id$...`); the plaintext is
//!   never persisted.
//! - Verification re-derives the hash under the stored parameters, which
//!   is inherently constant-time with respect to the candidate password.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::token::AuthError;

/// Hash a password for storage.
///
/// Returns a PHC-formatted hash string. Each call uses a fresh random
/// salt, so hashing the same password twice yields different strings.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch. Returns `Err`
/// only if the stored hash itself is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
