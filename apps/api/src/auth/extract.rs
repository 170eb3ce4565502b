use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::token;
use crate::errors::AppError;
use crate::state::AppState;

/// Caller identity resolved from the `Authorization: Bearer <token>` header.
///
/// This extractor is the single admission gate in front of every private
/// operation: a handler that takes an `AuthUser` argument cannot run
/// without a valid, unexpired token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;
        let id = token::verify(token, &state.config.jwt_secret)?;
        Ok(AuthUser { id })
    }
}
