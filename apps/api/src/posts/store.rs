use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::post::{CommentRow, LikeRow, PostAggregate, PostRow};

const POST_COLUMNS: &str = "id, user_id, text, name, avatar, created_at";
const COMMENT_COLUMNS: &str = "id, post_id, user_id, text, name, avatar, created_at";

/// Inserts a post, snapshotting the author's current name and avatar into
/// the row. The subselect keeps the snapshot and the insert in one statement.
pub async fn create_post(pool: &PgPool, author: Uuid, text: &str) -> Result<PostRow, AppError> {
    let post = sqlx::query_as(&format!(
        "INSERT INTO posts (user_id, text, name, avatar)
         SELECT u.id, $2, u.name, u.avatar FROM users u WHERE u.id = $1
         RETURNING {POST_COLUMNS}"
    ))
    .bind(author)
    .bind(text)
    .fetch_optional(pool)
    .await?;
    post.ok_or(AppError::Unauthorized)
}

/// All posts, newest first, each with its full like and comment sets.
pub async fn list_posts(pool: &PgPool) -> Result<Vec<PostAggregate>, AppError> {
    let posts: Vec<PostRow> = sqlx::query_as(&format!(
        "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    let likes: Vec<LikeRow> = sqlx::query_as("SELECT post_id, user_id FROM likes")
        .fetch_all(pool)
        .await?;
    let comments: Vec<CommentRow> = sqlx::query_as(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    let mut likes_by_post: HashMap<Uuid, Vec<LikeRow>> = HashMap::new();
    for like in likes {
        likes_by_post.entry(like.post_id).or_default().push(like);
    }
    let mut comments_by_post: HashMap<Uuid, Vec<CommentRow>> = HashMap::new();
    for comment in comments {
        comments_by_post
            .entry(comment.post_id)
            .or_default()
            .push(comment);
    }

    Ok(posts
        .into_iter()
        .map(|post| {
            let likes = likes_by_post.remove(&post.id).unwrap_or_default();
            let comments = comments_by_post.remove(&post.id).unwrap_or_default();
            PostAggregate {
                post,
                likes,
                comments,
            }
        })
        .collect())
}

pub async fn get_post(pool: &PgPool, id: Uuid) -> Result<PostAggregate, AppError> {
    let post = fetch_post(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let likes = likes_for_post(pool, id).await?;
    let comments: Vec<CommentRow> = sqlx::query_as(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 ORDER BY created_at"
    ))
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(PostAggregate {
        post,
        likes,
        comments,
    })
}

/// Deletes a post owned by `caller`; the FK cascade removes its likes and
/// comments in the same statement.
pub async fn delete_post(pool: &PgPool, id: Uuid, caller: Uuid) -> Result<(), AppError> {
    let post = fetch_post(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    if post.user_id != caller {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Records a like and returns the fresh like set for the post. The
/// existence pre-check gives a friendly `Conflict`; the composite primary
/// key on (post_id, user_id) is what actually prevents a double-like under
/// concurrent requests.
pub async fn like(pool: &PgPool, post_id: Uuid, caller: Uuid) -> Result<Vec<LikeRow>, AppError> {
    ensure_post_exists(pool, post_id).await?;
    if like_exists(pool, post_id, caller).await? {
        return Err(AppError::Conflict("Post already liked".to_string()));
    }

    sqlx::query("INSERT INTO likes (post_id, user_id) VALUES ($1, $2)")
        .bind(post_id)
        .bind(caller)
        .execute(pool)
        .await?;

    likes_for_post(pool, post_id).await
}

/// Removes a like and returns the fresh like set for the post.
pub async fn unlike(pool: &PgPool, post_id: Uuid, caller: Uuid) -> Result<Vec<LikeRow>, AppError> {
    ensure_post_exists(pool, post_id).await?;
    if !like_exists(pool, post_id, caller).await? {
        return Err(AppError::Conflict(
            "Post has not yet been liked".to_string(),
        ));
    }

    sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(caller)
        .execute(pool)
        .await?;

    likes_for_post(pool, post_id).await
}

/// Adds a comment with the author's name and avatar snapshotted at
/// creation time, as with posts.
pub async fn add_comment(
    pool: &PgPool,
    post_id: Uuid,
    author: Uuid,
    text: &str,
) -> Result<CommentRow, AppError> {
    ensure_post_exists(pool, post_id).await?;

    let comment = sqlx::query_as(&format!(
        "INSERT INTO comments (post_id, user_id, text, name, avatar)
         SELECT $1, u.id, $3, u.name, u.avatar FROM users u WHERE u.id = $2
         RETURNING {COMMENT_COLUMNS}"
    ))
    .bind(post_id)
    .bind(author)
    .bind(text)
    .fetch_optional(pool)
    .await?;
    comment.ok_or(AppError::Unauthorized)
}

/// Deletes a comment on a post; only its author may do so.
pub async fn delete_comment(
    pool: &PgPool,
    post_id: Uuid,
    comment_id: Uuid,
    caller: Uuid,
) -> Result<(), AppError> {
    ensure_post_exists(pool, post_id).await?;

    let comment: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM comments WHERE id = $1 AND post_id = $2")
            .bind(comment_id)
            .bind(post_id)
            .fetch_optional(pool)
            .await?;
    let (author,) = comment.ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
    if author != caller {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn fetch_post(pool: &PgPool, id: Uuid) -> Result<Option<PostRow>, AppError> {
    let post = sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(post)
}

async fn ensure_post_exists(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

async fn like_exists(pool: &PgPool, post_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

async fn likes_for_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<LikeRow>, AppError> {
    let likes = sqlx::query_as("SELECT post_id, user_id FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_all(pool)
        .await?;
    Ok(likes)
}

// Store-level tests run against a throwaway database created by
// `#[sqlx::test]` with the migrations applied. They are ignored by default
// so the unit suite stays runnable without a server; run them with
// DATABASE_URL set and `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::create_user;

    async fn seed_user(pool: &PgPool, name: &str, email: &str) -> Uuid {
        create_user(pool, name, email, "hash", "avatar")
            .await
            .unwrap()
            .id
    }

    async fn count_rows(pool: &PgPool, sql: &str, id: Uuid) -> i64 {
        let row: (i64,) = sqlx::query_as(sql).bind(id).fetch_one(pool).await.unwrap();
        row.0
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn like_unlike_like_yields_exactly_one_like(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        let post = create_post(&pool, ann, "hello world").await.unwrap().id;

        assert_eq!(like(&pool, post, bob).await.unwrap().len(), 1);
        assert!(unlike(&pool, post, bob).await.unwrap().is_empty());

        let likes = like(&pool, post, bob).await.unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].user_id, bob);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn double_like_is_rejected_and_leaves_the_set_unchanged(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        let post = create_post(&pool, ann, "hello world").await.unwrap().id;

        like(&pool, post, bob).await.unwrap();
        assert!(matches!(
            like(&pool, post, bob).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(likes_for_post(&pool, post).await.unwrap().len(), 1);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn liking_a_missing_post_is_not_found(pool: PgPool) {
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        assert!(matches!(
            like(&pool, Uuid::new_v4(), bob).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            unlike(&pool, Uuid::new_v4(), bob).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn deleting_a_post_cascades_its_likes_and_comments(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        let post = create_post(&pool, ann, "hello world").await.unwrap().id;
        like(&pool, post, bob).await.unwrap();
        add_comment(&pool, post, bob, "nice").await.unwrap();

        delete_post(&pool, post, ann).await.unwrap();

        assert!(matches!(
            get_post(&pool, post).await,
            Err(AppError::NotFound(_))
        ));
        let likes = count_rows(&pool, "SELECT count(*) FROM likes WHERE post_id = $1", post).await;
        let comments =
            count_rows(&pool, "SELECT count(*) FROM comments WHERE post_id = $1", post).await;
        assert_eq!((likes, comments), (0, 0));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn non_owner_delete_is_forbidden_and_mutates_nothing(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        let post = create_post(&pool, ann, "hello world").await.unwrap().id;

        assert!(matches!(
            delete_post(&pool, post, bob).await,
            Err(AppError::Forbidden)
        ));
        assert!(get_post(&pool, post).await.is_ok());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn comment_is_deletable_only_by_its_author(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let bob = seed_user(&pool, "Bob", "bob@x.com").await;
        let post = create_post(&pool, bob, "hello world").await.unwrap().id;
        let comment = add_comment(&pool, post, ann, "mine").await.unwrap().id;

        assert!(matches!(
            delete_comment(&pool, post, comment, bob).await,
            Err(AppError::Forbidden)
        ));
        assert_eq!(get_post(&pool, post).await.unwrap().comments.len(), 1);

        delete_comment(&pool, post, comment, ann).await.unwrap();
        assert!(get_post(&pool, post).await.unwrap().comments.is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server via DATABASE_URL"]
    async fn posts_are_listed_newest_first_with_their_children(pool: PgPool) {
        let ann = seed_user(&pool, "Ann", "ann@x.com").await;
        let first = create_post(&pool, ann, "first").await.unwrap().id;
        let second = create_post(&pool, ann, "second").await.unwrap().id;
        like(&pool, first, ann).await.unwrap();

        let posts = list_posts(&pool).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].post.id, second);
        assert_eq!(posts[1].post.id, first);
        assert_eq!(posts[1].likes.len(), 1);
    }
}
