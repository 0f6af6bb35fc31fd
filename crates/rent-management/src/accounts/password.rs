//! bcrypt password hashes. Both `$2a$` and `$2b$` hashes verify, so accounts
//! imported from other bcrypt implementations keep working.

/// Work factor used when nothing else is configured.
pub const DEFAULT_PASSWORD_COST: u32 = 10;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(#[from] bcrypt::BcryptError);

pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Checks `password` against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
