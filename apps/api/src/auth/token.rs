use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Fixed token lifetime of one hour from issuance.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Claims embedded in a bearer token: the user id and the validity window.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Signs a bearer token for `user_id`, valid for [`TOKEN_TTL_SECS`].
pub fn issue(user_id: Uuid, secret: &str) -> Result<String, AppError> {
    issue_with_ttl(user_id, secret, TOKEN_TTL_SECS)
}

fn issue_with_ttl(user_id: Uuid, secret: &str, ttl_secs: i64) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to sign token: {e}")))
}

/// Recomputes the signature and checks expiry; returns the embedded user id.
/// Stateless: never touches the credential store.
pub fn verify(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;
    Ok(data.claims.sub)
}
