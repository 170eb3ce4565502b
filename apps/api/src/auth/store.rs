use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{PublicUser, UserRow};

pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(exists.is_some())
}

/// Inserts a new user. The unique constraint on `email` backs the caller's
/// pre-check; a losing race still surfaces as `Conflict`.
pub async fn create_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    avatar: &str,
) -> Result<UserRow, AppError> {
    let user = sqlx::query_as(
        "INSERT INTO users (name, email, password, avatar) VALUES ($1, $2, $3, $4)
         RETURNING id, name, email, password, avatar, registered_at",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(avatar)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, AppError> {
    let user = sqlx::query_as(
        "SELECT id, name, email, password, avatar, registered_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Public projection by id; excludes the password hash by contract.
pub async fn find_public_by_id(pool: &PgPool, id: Uuid) -> Result<Option<PublicUser>, AppError> {
    let user =
        sqlx::query_as("SELECT id, name, email, avatar, registered_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(user)
}

/// Deletes the user row. The `ON DELETE CASCADE` rules on profiles,
/// experiences, educations, posts, likes and comments make the whole
/// ownership cascade a single atomic statement.
pub async fn delete_user(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
