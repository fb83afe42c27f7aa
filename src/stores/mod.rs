//! Boundary contracts for the collaborators of the verification flow:
//! the credential store, the one-time-code store, and the notification
//! sender. Production implementations are Postgres ([`PgCredentialStore`],
//! [`PgCodeStore`]) and SES (`services::email_service::SesSender`); tests
//! swap in in-memory doubles.

mod pg;

pub use pg::{PgCodeStore, PgCredentialStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    models::{CodePurpose, User, UserRole, VerificationCode},
};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Create an unverified user. A duplicate email fails with the same
    /// Conflict the pre-check produces, so registration races collapse
    /// into one error.
    async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User>;

    async fn set_email_verified(&self, email: &str) -> Result<Option<User>>;

    async fn set_password_hash(&self, email: &str, password_hash: &str)
        -> Result<Option<User>>;
}

#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Store a code for (email, purpose), superseding any active one.
    async fn put(
        &self,
        email: &str,
        purpose: CodePurpose,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationCode>;

    /// Atomically delete and return an unexpired exact match; `None` on a
    /// miss, which leaves any stored code untouched.
    async fn consume(
        &self,
        email: &str,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<VerificationCode>>;

    async fn delete_for(&self, email: &str, purpose: CodePurpose) -> Result<()>;

    async fn delete_expired(&self) -> Result<u64>;
}

#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(
        &self,
        to: &str,
        code: &str,
        purpose: CodePurpose,
        name: Option<&str>,
    ) -> Result<()>;
}
