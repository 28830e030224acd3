//! Error taxonomy and the JSON error envelope.
//!
//! Every failure leaves the API as
//! `{ "code": <status>, "error": { "message": .., "description": .. } }`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use warden_auth::{AuthzError, PasswordError, TokenError};
use warden_core::DomainError;
use warden_infra::StoreError;

/// Message returned for every failed login and every rejected bearer token.
pub const AUTHENTICATION_FAILED: &str = "Authentication failed.";

pub const SETUP_COMPLETED: &str = "Initial setup already completed.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("forbidden: {0}")]
    Authorization(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// First-user setup was attempted after a user already exists.
    #[error("initial setup already completed")]
    SetupCompleted,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) | ApiError::SetupCompleted => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn authentication() -> Self {
        ApiError::Authentication(AUTHENTICATION_FAILED.to_string())
    }

    /// Short, stable headline for the envelope's `message`.
    fn message(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "Validation Error",
            ApiError::Authentication(_) => AUTHENTICATION_FAILED,
            ApiError::Authorization(_) => "Forbidden",
            ApiError::Conflict(_) => "Already Exists",
            ApiError::NotFound(_) => "Not Found",
            ApiError::Internal(_) => "Internal Server Error",
            ApiError::SetupCompleted => SETUP_COMPLETED,
        }
    }

    fn description(&self) -> Option<&str> {
        match self {
            // Authentication details never leave the process.
            ApiError::Authentication(_) => None,
            // Internal details are logged, not returned.
            ApiError::Internal(_) | ApiError::SetupCompleted => None,
            ApiError::Validation(d)
            | ApiError::Authorization(d)
            | ApiError::Conflict(d)
            | ApiError::NotFound(d) => Some(d),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }

        json_error(status, self.message(), self.description())
    }
}

pub fn json_error(status: StatusCode, message: &str, description: Option<&str>) -> Response {
    let mut error = json!({ "message": message });
    if let Some(description) = description {
        error["description"] = json!(description);
    }
    (status, axum::Json(json!({ "code": status.as_u16(), "error": error }))).into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ApiError::Validation(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::NotFound => ApiError::NotFound("record not found".to_string()),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Authorization(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(msg) => ApiError::Internal(msg),
            other => ApiError::Authentication(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::authentication().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthzError::NoRoles).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(StoreError::Conflict("dup".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Backend("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_are_not_described() {
        assert_eq!(ApiError::Internal("db down".into()).description(), None);
        assert_eq!(ApiError::NotFound("role".into()).description(), Some("role"));
    }
}
