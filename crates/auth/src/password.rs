//! Salted password hashing (Argon2id, PHC string format).

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

use crate::fields::PlainPassword;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &PlainPassword) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.expose().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Check a candidate password against a stored hash.
///
/// An unparseable stored hash counts as a mismatch.
pub fn verify_password(candidate: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_original_password_only() {
        let pw = PlainPassword::parse("Password123").unwrap();
        let hash = hash_password(&pw).unwrap();

        assert!(verify_password("Password123", &hash));
        assert!(!verify_password("Password124", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let pw = PlainPassword::parse("Password123").unwrap();
        assert_ne!(hash_password(&pw).unwrap(), hash_password(&pw).unwrap());
    }

    #[test]
    fn corrupt_hash_never_verifies() {
        assert!(!verify_password("Password123", "not-a-phc-string"));
    }
}
