use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Full user row, including the password hash.
/// Fetched only by the authentication path; never serialized to a client.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
}

/// Public projection of a user, safe to return to clients.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
}
