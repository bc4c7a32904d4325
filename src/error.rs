use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Wire-level rejection codes shared by the HTTP layer and the session client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    AlreadyAttempted,
    AlreadySubmitted,
    NotYetAvailable,
    Expired,
    NotFound,
    Forbidden,
}

impl Rejection {
    pub fn code(self) -> &'static str {
        match self {
            Rejection::AlreadyAttempted => "ALREADY_ATTEMPTED",
            Rejection::AlreadySubmitted => "ALREADY_SUBMITTED",
            Rejection::NotYetAvailable => "NOT_YET_AVAILABLE",
            Rejection::Expired => "EXPIRED",
            Rejection::NotFound => "NOT_FOUND",
            Rejection::Forbidden => "FORBIDDEN",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Rejection::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::FORBIDDEN,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Rejection::AlreadyAttempted => "You have already attempted this quiz.",
            Rejection::AlreadySubmitted => "You have already submitted this quiz.",
            Rejection::NotYetAvailable => "This quiz is not yet available.",
            Rejection::Expired => "The time for this quiz has expired.",
            Rejection::NotFound => "Quiz not found",
            Rejection::Forbidden => "You are not allowed to perform this action.",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{rejection}: {message}")]
    Rejected {
        rejection: Rejection,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn rejected(rejection: Rejection) -> Self {
        Error::Rejected {
            rejection,
            message: rejection.default_message().to_string(),
        }
    }

    pub fn rejected_with(rejection: Rejection, message: impl Into<String>) -> Self {
        Error::Rejected {
            rejection,
            message: message.into(),
        }
    }

    /// The rejection code carried by this error, if it is an integrity rejection.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Error::Rejected { rejection, .. } => Some(*rejection),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            Error::Rejected { rejection, message } => (rejection.status(), rejection.code(), message),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, "VALIDATION", err.to_string()),
            Error::Database(err) => {
                tracing::error!(error = ?err, "Database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "A storage error occurred".to_string(),
                )
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
            }
            Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "success": false, "code": code, "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::rejected(Rejection::NotFound),
            other => Error::Database(other),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_codes_round_trip_through_serde() {
        let json = serde_json::to_string(&Rejection::AlreadySubmitted).unwrap();
        assert_eq!(json, "\"ALREADY_SUBMITTED\"");
        let back: Rejection = serde_json::from_str("\"NOT_YET_AVAILABLE\"").unwrap();
        assert_eq!(back, Rejection::NotYetAvailable);
    }

    #[test]
    fn not_found_is_distinct_from_forbidden() {
        assert_eq!(Rejection::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(Rejection::AlreadySubmitted.status(), StatusCode::FORBIDDEN);
        assert_eq!(Rejection::Expired.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn row_not_found_maps_to_not_found_rejection() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert_eq!(err.rejection(), Some(Rejection::NotFound));
    }
}
