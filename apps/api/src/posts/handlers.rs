use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::extract::AuthUser;
use crate::errors::AppError;
use crate::models::post::{CommentRow, LikeRow, PostAggregate, PostRow};
use crate::posts::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PostBody {
    #[serde(default)]
    pub text: String,
}

/// POST /api/posts
pub async fn handle_create_post(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<PostBody>,
) -> Result<Json<PostRow>, AppError> {
    let text = require_text(&req.text)?;
    let post = store::create_post(&state.db, caller.id, text).await?;
    Ok(Json(post))
}

/// GET /api/posts
pub async fn handle_list_posts(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<PostAggregate>>, AppError> {
    let posts = store::list_posts(&state.db).await?;
    Ok(Json(posts))
}

/// GET /api/posts/:id
pub async fn handle_get_post(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PostAggregate>, AppError> {
    let post = store::get_post(&state.db, id).await?;
    Ok(Json(post))
}

/// DELETE /api/posts/:id
pub async fn handle_delete_post(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    store::delete_post(&state.db, id, caller.id).await?;
    Ok(Json(json!({ "msg": "Post removed" })))
}

/// PUT /api/posts/like/:id
/// Returns the fresh like set so the caller can render an up-to-date count
/// without a second round trip.
pub async fn handle_like(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LikeRow>>, AppError> {
    let likes = store::like(&state.db, id, caller.id).await?;
    Ok(Json(likes))
}

/// PUT /api/posts/unlike/:id
pub async fn handle_unlike(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LikeRow>>, AppError> {
    let likes = store::unlike(&state.db, id, caller.id).await?;
    Ok(Json(likes))
}

/// POST /api/posts/comment/:id
pub async fn handle_add_comment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PostBody>,
) -> Result<Json<CommentRow>, AppError> {
    let text = require_text(&req.text)?;
    let comment = store::add_comment(&state.db, id, caller.id, text).await?;
    Ok(Json(comment))
}

/// DELETE /api/posts/comment/:post_id/:comment_id
pub async fn handle_delete_comment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    store::delete_comment(&state.db, post_id, comment_id, caller.id).await?;
    Ok(Json(json!({ "msg": "Comment removed" })))
}

fn require_text(text: &str) -> Result<&str, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Text is required".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed() {
        assert_eq!(require_text("  hello world ").unwrap(), "hello world");
    }

    #[test]
    fn blank_text_is_a_validation_error() {
        for text in ["", "   ", "\n\t"] {
            assert!(matches!(
                require_text(text),
                Err(AppError::Validation(msg)) if msg == "Text is required"
            ));
        }
    }
}
