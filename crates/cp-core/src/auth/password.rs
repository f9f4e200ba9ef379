//! Password hashing and verification using Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Hashing failed.
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Verification failed for a reason other than a wrong password.
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// The stored hash is not a valid PHC string.
    #[error("Invalid password hash format")]
    InvalidHash,
}

/// Hashes a password with Argon2id and a random salt.
///
/// # Example
///
/// ```
/// use cp_core::auth::password::hash_password;
///
/// let hash = hash_password("Sup3rSecret").unwrap();
/// assert!(hash.starts_with("$argon2"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored hash.
///
/// Returns `Ok(false)` for a wrong password; errors only when the stored
/// hash is malformed or verification itself fails.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks a password against the account password policy.
///
/// Returns a list of violated rules; an empty list means the password is
/// acceptable.
///
/// # Example
///
/// ```
/// use cp_core::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Winter2024").is_empty());
/// assert!(!validate_password_strength("short").is_empty());
/// ```
pub fn validate_password_strength(password: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();

    if password.len() < 8 {
        violations.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push("Password must contain a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push("Password must contain an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("Password must contain a digit");
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("CorrectHorse1").unwrap();

        assert!(verify_password("CorrectHorse1", &hash).unwrap());
        assert!(!verify_password("WrongHorse1", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("SamePassword1").unwrap();
        let b = hash_password("SamePassword1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHash)));
    }

    #[test]
    fn test_strength_too_short() {
        let violations = validate_password_strength("Ab1");
        assert!(violations
            .iter()
            .any(|v| v.contains("at least 8 characters")));
    }

    #[test]
    fn test_strength_missing_classes() {
        assert!(validate_password_strength("alllowercase1")
            .iter()
            .any(|v| v.contains("uppercase")));
        assert!(validate_password_strength("ALLUPPERCASE1")
            .iter()
            .any(|v| v.contains("lowercase")));
        assert!(validate_password_strength("NoDigitsHere")
            .iter()
            .any(|v| v.contains("digit")));
    }

    #[test]
    fn test_strength_acceptable() {
        assert!(validate_password_strength("Feedback2025").is_empty());
    }
}
