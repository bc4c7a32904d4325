use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Rejection};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Educator,
    Admin,
}

impl Role {
    /// Unknown or missing roles fall back to `Student`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("admin") => Role::Admin,
            Some("educator") => Role::Educator,
            _ => Role::Student,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Educator => "educator",
            Role::Admin => "admin",
        }
    }

    pub fn can_manage_quizzes(self) -> bool {
        matches!(self, Role::Educator | Role::Admin)
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// The authenticated caller, placed in request extensions by
/// [`require_bearer_auth`].
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
    pub role: Role,
}

fn decode_bearer(headers: &HeaderMap, secret: &str) -> Result<Claims, &'static str> {
    let auth_header = headers.get(AUTHORIZATION).ok_or("missing_authorization")?;
    let auth_str = auth_header.to_str().map_err(|_| "bad_authorization")?;
    let token = auth_str.strip_prefix("Bearer ").ok_or("unsupported_scheme")?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| "invalid_token")
}

pub async fn require_bearer_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match decode_bearer(req.headers(), &state.jwt_secret) {
        Ok(claims) => {
            let caller = CallerIdentity {
                role: Role::parse(claims.role.as_deref()),
                user_id: claims.sub,
            };
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Err(reason) => {
            tracing::debug!(reason, "Bearer authentication failed");
            Error::Unauthorized(reason.to_string()).into_response()
        }
    }
}

/// Lets educators and admins through. Must run after [`require_bearer_auth`].
pub async fn require_educator(req: Request, next: Next) -> Response {
    let allowed = req
        .extensions()
        .get::<CallerIdentity>()
        .map(|caller| caller.role.can_manage_quizzes());

    match allowed {
        Some(true) => next.run(req).await,
        Some(false) => Error::rejected_with(
            Rejection::Forbidden,
            "Unauthorized Access: Not an Educator or Admin",
        )
        .into_response(),
        None => Error::Unauthorized("missing_authorization".to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::token::issue_token;
    use axum::http::HeaderValue;
    use chrono::Duration;

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(Role::parse(Some("Educator")), Role::Educator);
        assert_eq!(Role::parse(Some("ADMIN")), Role::Admin);
        assert_eq!(Role::parse(Some("instructor")), Role::Student);
        assert_eq!(Role::parse(None), Role::Student);
        assert!(!Role::Student.can_manage_quizzes());
    }

    #[test]
    fn bearer_tokens_round_trip() {
        let token = issue_token("s3cret", "user-9", Role::Educator, Duration::minutes(5)).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let claims = decode_bearer(&headers, "s3cret").unwrap();
        assert_eq!(claims.sub, "user-9");
        assert_eq!(claims.role.as_deref(), Some("educator"));

        assert_eq!(decode_bearer(&headers, "other").unwrap_err(), "invalid_token");
    }

    #[test]
    fn missing_or_foreign_scheme_is_refused() {
        let mut headers = HeaderMap::new();
        assert_eq!(decode_bearer(&headers, "k").unwrap_err(), "missing_authorization");
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(decode_bearer(&headers, "k").unwrap_err(), "unsupported_scheme");
    }
}
