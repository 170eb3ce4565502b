use sqlx::PgPool;

use crate::config::Config;
use crate::github::GithubClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Read-only proxy to the GitHub repos API.
    pub github: GithubClient,
}
