//! Password-related utilities.
//!
//! Hashes are Argon2id PHC strings with a random salt per hash, so the same
//! password never hashes the same way twice.

use anyhow::format_err;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::ServerError;

/// Hash a password, returning its PHC string.
pub fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format_err!("failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string.
///
/// A malformed hash never verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is malformed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_verification() {
        let hash = hash_password("cat").unwrap();
        assert!(verify_password("cat", &hash));
        assert!(!verify_password("dog", &hash));
    }

    #[test]
    fn test_password_salts_are_random() {
        let a = hash_password("cat").unwrap();
        let b = hash_password("cat").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_plaintext_is_not_stored() {
        let hash = hash_password("rubicon").unwrap();
        assert!(!hash.contains("rubicon"));
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_malformed_hash() {
        assert!(!verify_password("cat", "abc"));
    }
}
