use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::Result,
    models::{CodePurpose, VerificationCode},
};

/// Store a code for (email, purpose), superseding any active one. The
/// UNIQUE (email, purpose) index makes at-most-one-active-code a hard
/// invariant rather than a delete-then-insert race.
pub async fn upsert_code(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<VerificationCode> {
    let verification_code = sqlx::query_as::<_, VerificationCode>(
        "INSERT INTO verification_codes (email, purpose, code, expires_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (email, purpose)
         DO UPDATE SET code = EXCLUDED.code,
                       expires_at = EXCLUDED.expires_at,
                       created_at = now()
         RETURNING *",
    )
    .bind(email)
    .bind(purpose)
    .bind(code)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(verification_code)
}

/// Atomically delete and return an unexpired exact match. A miss (wrong
/// code, wrong purpose, or expired) deletes nothing, so the holder may
/// retry until expiry or supersession.
pub async fn consume_code(
    pool: &PgPool,
    email: &str,
    purpose: CodePurpose,
    code: &str,
) -> Result<Option<VerificationCode>> {
    let verification_code = sqlx::query_as::<_, VerificationCode>(
        "DELETE FROM verification_codes
         WHERE email = $1 AND purpose = $2 AND code = $3 AND expires_at > now()
         RETURNING *",
    )
    .bind(email)
    .bind(purpose)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(verification_code)
}

/// Compensating delete after a failed notification send.
pub async fn delete_codes_for(pool: &PgPool, email: &str, purpose: CodePurpose) -> Result<()> {
    sqlx::query("DELETE FROM verification_codes WHERE email = $1 AND purpose = $2")
        .bind(email)
        .bind(purpose)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn cleanup_expired_codes(pool: &PgPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM verification_codes WHERE expires_at < now()")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
