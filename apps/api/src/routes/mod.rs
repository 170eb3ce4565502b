pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::posts::handlers as posts;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Identity
        .route("/api/users", post(auth::handle_register))
        .route(
            "/api/auth",
            post(auth::handle_login).get(auth::handle_me),
        )
        // Profiles
        .route(
            "/api/profile",
            post(profile::handle_upsert_profile)
                .get(profile::handle_list_profiles)
                .delete(profile::handle_delete_account),
        )
        .route("/api/profile/me", get(profile::handle_my_profile))
        .route(
            "/api/profile/user/:user_id",
            get(profile::handle_profile_by_user),
        )
        .route(
            "/api/profile/experience",
            put(profile::handle_add_experience),
        )
        .route(
            "/api/profile/experience/:id",
            delete(profile::handle_delete_experience),
        )
        .route("/api/profile/education", put(profile::handle_add_education))
        .route(
            "/api/profile/education/:id",
            delete(profile::handle_delete_education),
        )
        .route(
            "/api/profile/github/:username",
            get(profile::handle_github_repos),
        )
        // Posts
        .route(
            "/api/posts",
            post(posts::handle_create_post).get(posts::handle_list_posts),
        )
        .route(
            "/api/posts/:id",
            get(posts::handle_get_post).delete(posts::handle_delete_post),
        )
        .route("/api/posts/like/:id", put(posts::handle_like))
        .route("/api/posts/unlike/:id", put(posts::handle_unlike))
        .route("/api/posts/comment/:id", post(posts::handle_add_comment))
        .route(
            "/api/posts/comment/:post_id/:comment_id",
            delete(posts::handle_delete_comment),
        )
        .with_state(state)
}
