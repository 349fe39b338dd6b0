#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Bcrypt failed: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),
}

pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST).map_err(PasswordError::from)
}

/// Verify a password against a bcrypt hash
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(plaintext, hash).map_err(PasswordError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("test_password").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("test_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("test_password").unwrap();
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test_password", "invalid_hash").is_err());
    }
}
