use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Post row. `name` and `avatar` are snapshots of the author taken at
/// creation time; they do not track later changes to the user record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LikeRow {
    pub post_id: Uuid,
    pub user_id: Uuid,
}

/// Comment row, with the same author snapshot rule as posts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// A post bundled with its full like and comment sets.
#[derive(Debug, Clone, Serialize)]
pub struct PostAggregate {
    #[serde(flatten)]
    pub post: PostRow,
    pub likes: Vec<LikeRow>,
    pub comments: Vec<CommentRow>,
}
