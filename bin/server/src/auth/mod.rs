//! Authentication module for the keystone server.
//!
//! This module provides:
//! - Login and token refresh endpoints
//! - Per-request resolution of the `SecurityContext` from the token header
//! - The `Secured` extractor handlers use to reach the context
//!
//! # Request flow
//!
//! The `security_context` middleware runs for every route. It verifies the
//! token (if any), loads the principal, stores the resulting context in the
//! request extensions and binds the field-visibility descriptor matching the
//! request to the task for the rest of the request.

pub mod middleware;
pub mod routes;

use keystone_token::{Authenticator, TokenManager};

pub use middleware::{Secured, security_context};
pub use routes::{login, refresh_token};

/// Header carrying the client's device kind on login.
pub const DEVICE_TYPE_HEADER: &str = "x-device-type";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Token issue and verification.
    pub tokens: TokenManager,
    /// Credential verification and principal lookup.
    pub authenticator: Authenticator,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(tokens: TokenManager, authenticator: Authenticator) -> Self {
        Self {
            tokens,
            authenticator,
        }
    }

    /// Returns the name of the header that carries the token.
    #[must_use]
    pub fn token_header(&self) -> &str {
        self.tokens.config().header()
    }
}
