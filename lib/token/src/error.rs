//! Token lifecycle error types.
//!
//! Errors are designed for layered context using rootcause: operations
//! return `Report<TokenError>` and callers attach their own context.

use std::fmt;

/// Errors from credential verification and token handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Username unknown or password mismatch. The two are not distinguished.
    InvalidCredentials,
    /// The account exists but is disabled.
    AccountDisabled {
        /// The login name.
        username: String,
    },
    /// The token's expiry has passed.
    Expired,
    /// The token is malformed, tampered with or from another issuer.
    InvalidToken {
        /// Error details.
        details: String,
    },
    /// The token may not be refreshed.
    NotRefreshable,
    /// Signing a token failed.
    Signing {
        /// Error details.
        details: String,
    },
    /// Hashing or parsing a password hash failed.
    Hashing {
        /// Error details.
        details: String,
    },
    /// The token configuration is unusable.
    Configuration {
        /// Error details.
        details: String,
    },
    /// The user directory could not be read.
    Directory {
        /// Error details.
        details: String,
    },
}

impl TokenError {
    /// Returns true for errors caused by the caller's input rather than
    /// by the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::AccountDisabled { .. }
                | Self::Expired
                | Self::InvalidToken { .. }
                | Self::NotRefreshable
        )
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::AccountDisabled { username } => {
                write!(f, "account '{}' is disabled", username)
            }
            Self::Expired => write!(f, "token has expired"),
            Self::InvalidToken { details } => write!(f, "invalid token: {}", details),
            Self::NotRefreshable => write!(f, "token cannot be refreshed"),
            Self::Signing { details } => write!(f, "failed to sign token: {}", details),
            Self::Hashing { details } => write!(f, "password hashing failed: {}", details),
            Self::Configuration { details } => {
                write!(f, "invalid token configuration: {}", details)
            }
            Self::Directory { details } => {
                write!(f, "user directory unavailable: {}", details)
            }
        }
    }
}

impl std::error::Error for TokenError {}
