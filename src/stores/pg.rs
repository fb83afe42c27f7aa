use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::Result,
    models::{CodePurpose, User, UserRole, VerificationCode},
    queries::{code_queries, user_queries},
};

use super::{CodeStore, CredentialStore};

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        user_queries::find_by_email(&self.pool, email).await
    }

    async fn create(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User> {
        user_queries::create_user(&self.pool, email, name, password_hash, role).await
    }

    async fn set_email_verified(&self, email: &str) -> Result<Option<User>> {
        user_queries::set_email_verified(&self.pool, email).await
    }

    async fn set_password_hash(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        user_queries::set_password_hash(&self.pool, email, password_hash).await
    }
}

#[derive(Clone)]
pub struct PgCodeStore {
    pool: PgPool,
}

impl PgCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn put(
        &self,
        email: &str,
        purpose: CodePurpose,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationCode> {
        code_queries::upsert_code(&self.pool, email, purpose, code, expires_at).await
    }

    async fn consume(
        &self,
        email: &str,
        purpose: CodePurpose,
        code: &str,
    ) -> Result<Option<VerificationCode>> {
        code_queries::consume_code(&self.pool, email, purpose, code).await
    }

    async fn delete_for(&self, email: &str, purpose: CodePurpose) -> Result<()> {
        code_queries::delete_codes_for(&self.pool, email, purpose).await
    }

    async fn delete_expired(&self) -> Result<u64> {
        code_queries::cleanup_expired_codes(&self.pool).await
    }
}
