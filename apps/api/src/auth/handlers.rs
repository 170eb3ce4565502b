use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::extract::AuthUser;
use crate::auth::{gravatar, password, store, token};
use crate::errors::AppError;
use crate::models::user::PublicUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/users
/// Registers a user and returns a bearer token (auto-login).
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_registration(&req)?;

    let email = req.email.trim().to_lowercase();
    if store::email_taken(&state.db, &email).await? {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let avatar = gravatar::avatar_url(&email);
    let hash = password::hash(&req.password)?;
    let user = store::create_user(&state.db, req.name.trim(), &email, &hash, &avatar).await?;

    tracing::info!(user_id = %user.id, "registered new user");
    let token = token::issue(user.id, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse { token }))
}

/// POST /api/auth
/// Authenticates by email and password and returns a bearer token.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_login(&req)?;

    let email = req.email.trim().to_lowercase();
    // The response never distinguishes an unknown email from a bad
    // password; only the log does.
    let user = match store::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            tracing::debug!("login attempt for unknown email");
            return Err(AppError::Validation("Invalid credentials".to_string()));
        }
    };

    if !password::verify(&req.password, &user.password) {
        tracing::debug!(user_id = %user.id, "login attempt with wrong password");
        return Err(AppError::Validation("Invalid credentials".to_string()));
    }

    let token = token::issue(user.id, &state.config.jwt_secret)?;
    Ok(Json(TokenResponse { token }))
}

/// GET /api/auth
/// Returns the caller's own public user record.
pub async fn handle_me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    // A valid token for a since-deleted user is no longer an identity.
    let user = store::find_public_by_id(&state.db, caller.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user))
}

fn validate_login(req: &LoginRequest) -> Result<(), AppError> {
    if !is_plausible_email(&req.email) {
        return Err(AppError::Validation(
            "Please include a valid email".to_string(),
        ));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    Ok(())
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !is_plausible_email(&req.email) {
        return Err(AppError::Validation(
            "Please include a valid email".to_string(),
        ));
    }
    if req.password.chars().count() < 6 {
        return Err(AppError::Validation(
            "Please enter a password with 6 or more characters".to_string(),
        ));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}
