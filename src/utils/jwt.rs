use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    error::{AppError, Result},
    models::{User, UserRole},
};

/// Session lifetime. Tokens are stateless; invalidation is purely by
/// expiry or the client clearing its cookie.
pub const SESSION_TTL_DAYS: i64 = 7;

const RESET_TOKEN_TTL_MINUTES: i64 = 60;
const RESET_TOKEN_PURPOSE: &str = "password-reset";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetTokenClaims {
    pub sub: String,
    pub purpose: String,
    pub exp: usize,
}

pub fn sign_session(auth: &AuthConfig, user: &User) -> Result<String> {
    let now = chrono::Utc::now();
    let expiration = now
        .checked_add_signed(chrono::Duration::days(SESSION_TTL_DAYS))
        .ok_or_else(|| AppError::InternalError("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = SessionClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        exp: expiration,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {}", e)))
}

/// Bad signature and expiry reject identically: the caller must
/// re-authenticate either way.
pub fn verify_session(auth: &AuthConfig, token: &str) -> Result<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired session".to_string()))
}

/// Short-lived token for password-reset confirmation links, distinguished
/// from sessions by its purpose claim.
pub fn sign_password_reset_token(auth: &AuthConfig, user_id: i32) -> Result<String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::minutes(RESET_TOKEN_TTL_MINUTES))
        .ok_or_else(|| AppError::InternalError("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = ResetTokenClaims {
        sub: user_id.to_string(),
        purpose: RESET_TOKEN_PURPOSE.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {}", e)))
}

/// Returns the subject (user id) on success. Fails on bad signature,
/// expiry, or a purpose claim other than `password-reset`.
pub fn verify_password_reset_token(auth: &AuthConfig, token: &str) -> Result<String> {
    let claims = decode::<ResetTokenClaims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    if claims.purpose != RESET_TOKEN_PURPOSE {
        return Err(AppError::Unauthorized("Token purpose mismatch".to_string()));
    }

    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_auth() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            admin_emails: HashSet::new(),
            secure_cookies: false,
        }
    }

    fn test_user() -> User {
        let now = chrono::Utc::now();
        User {
            id: 42,
            email: "a@x.com".to_string(),
            name: Some("Ann".to_string()),
            password_hash: "$2b$12$irrelevant".to_string(),
            role: UserRole::Admin,
            email_verified: Some(true),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn session_round_trip() {
        let auth = test_auth();
        let token = sign_session(&auth, &test_user()).expect("signing should succeed");

        let claims = verify_session(&auth, &token).expect("verification should succeed");
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, UserRole::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_rejects() {
        let auth = test_auth();
        let token = sign_session(&auth, &test_user()).expect("signing should succeed");

        let other = AuthConfig {
            jwt_secret: "a-different-secret".to_string(),
            ..test_auth()
        };
        assert!(matches!(
            verify_session(&other, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_session_rejects() {
        let auth = test_auth();
        let now = chrono::Utc::now().timestamp();

        // Expired well past jsonwebtoken's default 60s leeway.
        let claims = SessionClaims {
            sub: "1".to_string(),
            email: "a@x.com".to_string(),
            role: UserRole::User,
            exp: (now - 300) as usize,
            iat: (now - 600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
        )
        .expect("encoding should succeed");

        assert!(matches!(
            verify_session(&auth, &token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn reset_token_round_trip() {
        let auth = test_auth();
        let token = sign_password_reset_token(&auth, 7).expect("signing should succeed");
        let sub = verify_password_reset_token(&auth, &token).expect("verification should succeed");
        assert_eq!(sub, "7");
    }

    #[test]
    fn reset_token_rejects_wrong_purpose() {
        let auth = test_auth();

        // A token with the right shape but a different purpose claim.
        let claims = ResetTokenClaims {
            sub: "7".to_string(),
            purpose: "something-else".to_string(),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
        )
        .expect("encoding should succeed");

        assert!(matches!(
            verify_password_reset_token(&auth, &token),
            Err(AppError::Unauthorized(_))
        ));
    }
}
