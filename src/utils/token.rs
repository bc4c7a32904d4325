use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::error::{Error, Result};
use crate::middleware::auth::{Claims, Role};

/// Signs an HS256 bearer token for `user_id`.
///
/// Identity is owned by an external provider; this exists for local tooling
/// and tests that need to speak to the authenticated routes.
pub fn issue_token(secret: &str, user_id: &str, role: Role, ttl: Duration) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
        role: Some(role.as_str().to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}
