use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::ApiError;

/// Well-formed Argon2id hash (default parameters) that no password matches.
/// Verifying against it costs the same as a real check.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$7c+5HoL8ffREEaBMRWXNhQ$MPrv+w/h0D5F/TGUd3B1x69u6kePrUey+Tq37ngU5GQ";

/// Hash with Argon2id and a fresh random salt. Deliberately slow; never call
/// this while holding the store lock.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::ServerFailure(format!("password hashing failed: {e}")))
}

/// `Ok(false)` on mismatch. A stored hash that does not parse is a server
/// failure, not a bad login.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::ServerFailure(format!("stored password hash unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
