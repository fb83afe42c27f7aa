use crate::error::{AppError, Result};

/// Fixed bcrypt work factor. Raising it only affects new hashes; stored
/// hashes embed their own cost.
const BCRYPT_COST: u32 = 12;

pub fn hash(password: &str) -> Result<String> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

/// Constant-time comparison is delegated to bcrypt. A malformed stored
/// hash is a non-match, never an error.
pub fn verify(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hashed = hash("Abcd123!").expect("hashing should succeed");
        assert!(hashed.starts_with("$2"), "expected a bcrypt hash");
        assert!(verify("Abcd123!", &hashed));
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hashed = hash("correct-password").expect("hashing should succeed");
        assert!(!verify("wrong-password", &hashed));
    }

    #[test]
    fn malformed_hash_is_a_non_match() {
        assert!(!verify("anything", "not-a-bcrypt-hash"));
        assert!(!verify("anything", ""));
    }
}
