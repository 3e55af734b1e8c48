//! Credential verification and token lifecycle for keystone.
//!
//! This crate provides:
//! - Argon2 password hashing and a pluggable `UserDirectory`
//! - `Authenticator` for username/password login
//! - `TokenManager` for issuing, validating and refreshing signed tokens
//!
//! Tokens carry the username as subject and the client's [`DeviceKind`] as
//! audience. A token can be refreshed when it was created after the last
//! credential reset and is either unexpired or was issued to a mobile or
//! tablet device.

pub mod claims;
pub mod config;
pub mod credentials;
pub mod error;
pub mod manager;

pub use claims::{Claims, DeviceKind};
pub use config::{JwtConfig, MAX_EXPIRATION_SECS};
pub use credentials::{
    Authenticator, InMemoryDirectory, UserAccount, UserDirectory, hash_password, verify_password,
};
pub use error::TokenError;
pub use manager::TokenManager;
