use crate::error::AppError;

// bcrypt work factor, matching what the user records were hashed with
const COST: u32 = 12;

/// Hashes a plaintext password with bcrypt and a fresh random salt.
pub fn hash(plaintext: &str) -> Result<String, AppError> {
    bcrypt::hash(plaintext, COST).map_err(|e| AppError::InternalError(e.to_string()))
}

/// Checks a plaintext password against a stored digest. Mismatches and
/// malformed digests both return false; this never errors.
pub fn compare(plaintext: &str, digest: &str) -> bool {
    bcrypt::verify(plaintext, digest).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_compare() {
        let digest = hash("correct horse battery staple").unwrap();
        assert!(compare("correct horse battery staple", &digest));
        assert!(!compare("wrong password", &digest));
    }

    #[test]
    fn test_salts_are_random() {
        let first = hash("same password").unwrap();
        let second = hash("same password").unwrap();
        assert_ne!(first, second);

        assert!(compare("same password", &first));
        assert!(compare("same password", &second));
    }

    #[test]
    fn test_malformed_digest_is_false_not_error() {
        assert!(!compare("anything", "not-a-bcrypt-digest"));
        assert!(!compare("anything", ""));
    }

    #[test]
    fn test_digest_uses_configured_cost() {
        let digest = hash("pw").unwrap();
        assert!(digest.contains("$12$"));
    }
}
