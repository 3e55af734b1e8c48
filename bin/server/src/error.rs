//! HTTP error mapping.
//!
//! Domain errors are converted to responses only here. Every error body is
//! `{code, message}` with a stable code; internal details are logged and
//! never returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keystone_access::AccessError;
use keystone_token::TokenError;
use rootcause::prelude::Report;
use serde::Serialize;
use std::fmt;

/// Message returned when a token cannot be refreshed.
pub const INVALID_ORIGINAL_TOKEN: &str = "original token is invalid";

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// Guard or resolver failure.
    Access(AccessError),
    /// Credential or token failure caused by the caller.
    Token(TokenError),
    /// Malformed request.
    BadRequest { message: String },
    /// Target does not exist.
    NotFound { message: String },
    /// Unexpected failure, already logged.
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Access(AccessError::Unauthorized { .. }) => StatusCode::UNAUTHORIZED,
            Self::Access(AccessError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            Self::Token(TokenError::NotRefreshable) | Self::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::Access(AccessError::Unauthorized { reason }) => {
                ErrorBody::new(reason.code(), reason.message())
            }
            Self::Access(AccessError::Forbidden { reason }) => {
                ErrorBody::new(reason.code(), reason.message())
            }
            Self::Token(TokenError::InvalidCredentials) => {
                ErrorBody::new("invalid_credentials", "invalid username or password")
            }
            Self::Token(TokenError::AccountDisabled { .. }) => {
                ErrorBody::new("account_disabled", "account is disabled")
            }
            Self::Token(TokenError::NotRefreshable) => {
                ErrorBody::new("bad_request", INVALID_ORIGINAL_TOKEN)
            }
            Self::Token(_) => ErrorBody::new("invalid_token", "token is invalid or expired"),
            Self::BadRequest { message } => ErrorBody::new("bad_request", message.clone()),
            Self::NotFound { message } => ErrorBody::new("not_found", message.clone()),
            Self::Internal => ErrorBody::new("internal_error", "internal server error"),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access(e) => write!(f, "{e}"),
            Self::Token(e) => write!(f, "{e}"),
            Self::BadRequest { message } => write!(f, "bad request: {message}"),
            Self::NotFound { message } => write!(f, "not found: {message}"),
            Self::Internal => write!(f, "internal server error"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<AccessError> for ApiError {
    fn from(error: AccessError) -> Self {
        Self::Access(error)
    }
}

impl From<Report<TokenError>> for ApiError {
    fn from(report: Report<TokenError>) -> Self {
        let error = report.current_context();
        if error.is_client_error() {
            Self::Token(error.clone())
        } else {
            tracing::error!(error = %report, "token service failure");
            Self::Internal
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_access::{ForbiddenReason, UnauthorizedReason};

    #[test]
    fn access_errors_map_to_401_and_403() {
        assert_eq!(
            ApiError::from(AccessError::unauthorized(UnauthorizedReason::Unauthenticated)).status(),
            StatusCode::UNAUTHORIZED
        );
        let anonymous = ApiError::from(AccessError::unauthorized(UnauthorizedReason::Anonymous));
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(anonymous.body().code, "anonymous");

        let forbidden = ApiError::from(AccessError::forbidden(ForbiddenReason::NotRoot));
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.body().code, "not_root");
    }

    #[test]
    fn refusal_to_refresh_is_a_bad_request() {
        let error = ApiError::from(Report::from(TokenError::NotRefreshable));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.body().code, "bad_request");
        assert_eq!(error.body().message, INVALID_ORIGINAL_TOKEN);
    }

    #[test]
    fn server_side_token_failures_are_hidden() {
        let error = ApiError::from(Report::from(TokenError::Directory {
            details: "/etc/keystone/users.json: permission denied".to_string(),
        }));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.body().message.contains("users.json"));
    }

    #[test]
    fn credential_failures_are_unauthorized() {
        let error = ApiError::from(Report::from(TokenError::InvalidCredentials));
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.body().code, "invalid_credentials");
    }
}
