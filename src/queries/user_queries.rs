use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    models::{User, UserRole},
};

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    password_hash: &str,
    role: UserRole,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name, password_hash, role, email_verified)
         VALUES ($1, $2, $3, $4, FALSE)
         RETURNING *",
    )
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        // Unique violation on users.email: a concurrent registration won the race.
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email already in use".to_string())
        }
        other => AppError::DatabaseError(other),
    })?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn set_email_verified(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET email_verified = TRUE, updated_at = now()
         WHERE email = $1
         RETURNING *",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn set_password_hash(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET password_hash = $2, updated_at = now()
         WHERE email = $1
         RETURNING *",
    )
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}
