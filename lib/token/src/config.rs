//! Token signing configuration.

use keystone_core::Result;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Minimum secret length before a warning is logged.
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime, ten years.
pub const MAX_EXPIRATION_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Configuration for issuing and verifying tokens.
///
/// Only `secret` is required; every other field has a default so the
/// configuration can be loaded from a handful of environment variables.
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HMAC signing secret.
    #[serde(skip_serializing)]
    secret: String,
    /// Value of the `iss` claim, checked on every decode.
    /// Default: "keystone"
    #[serde(default = "default_issuer")]
    issuer: String,
    /// Request header that carries the token.
    /// Default: "Authorization"
    #[serde(default = "default_header")]
    header: String,
    /// Token lifetime in seconds.
    /// Default: 604800 (7 days)
    #[serde(default = "default_expiration_secs")]
    expiration_secs: i64,
    /// Clock skew tolerance in seconds.
    /// Default: 60
    #[serde(default = "default_leeway_secs")]
    leeway_secs: u64,
}

fn default_issuer() -> String {
    "keystone".to_string()
}

fn default_header() -> String {
    "Authorization".to_string()
}

fn default_expiration_secs() -> i64 {
    7 * 24 * 60 * 60
}

fn default_leeway_secs() -> u64 {
    60
}

impl JwtConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: default_issuer(),
            header: default_header(),
            expiration_secs: default_expiration_secs(),
            leeway_secs: default_leeway_secs(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Sets the token lifetime. `validate` rejects values outside
    /// `1..=MAX_EXPIRATION_SECS`.
    #[must_use]
    pub fn with_expiration_secs(mut self, secs: i64) -> Self {
        self.expiration_secs = secs;
        self
    }

    #[must_use]
    pub fn with_leeway_secs(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    #[must_use]
    pub fn expiration_secs(&self) -> i64 {
        self.expiration_secs
    }

    #[must_use]
    pub fn leeway_secs(&self) -> u64 {
        self.leeway_secs
    }

    /// Checks that the configuration can sign tokens.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` for an empty secret or header, or
    /// a lifetime that is not positive or exceeds `MAX_EXPIRATION_SECS`.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::Configuration {
                details: "signing secret is not configured".to_string(),
            }
            .into());
        }
        if self.header.trim().is_empty() {
            return Err(TokenError::Configuration {
                details: "token header name is empty".to_string(),
            }
            .into());
        }
        if !(1..=MAX_EXPIRATION_SECS).contains(&self.expiration_secs) {
            return Err(TokenError::Configuration {
                details: format!(
                    "token lifetime must be between 1 and {MAX_EXPIRATION_SECS} seconds, got {}",
                    self.expiration_secs
                ),
            }
            .into());
        }
        if self.secret.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                len = self.secret.len(),
                "signing secret is shorter than {RECOMMENDED_SECRET_LEN} bytes"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("header", &self.header)
            .field("expiration_secs", &self.expiration_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: JwtConfig =
            serde_json::from_str(r#"{"secret": "0123456789abcdef0123456789abcdef"}"#)
                .expect("deserialize");

        assert_eq!(config.issuer(), "keystone");
        assert_eq!(config.header(), "Authorization");
        assert_eq!(config.expiration_secs(), 604_800);
        assert_eq!(config.leeway_secs(), 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let err = JwtConfig::new("").validate().expect_err("empty secret");
        assert!(matches!(
            err.current_context(),
            TokenError::Configuration { .. }
        ));
    }

    #[test]
    fn lifetime_must_be_positive_and_bounded() {
        let config = JwtConfig::new("0123456789abcdef0123456789abcdef");

        for secs in [0, -1, MAX_EXPIRATION_SECS + 1, i64::MAX] {
            let err = config
                .clone()
                .with_expiration_secs(secs)
                .validate()
                .expect_err("out of range lifetime");
            assert!(matches!(
                err.current_context(),
                TokenError::Configuration { .. }
            ));
        }
        assert!(config.with_expiration_secs(MAX_EXPIRATION_SECS).validate().is_ok());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = JwtConfig::new("super-secret-value");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn secret_is_never_serialized() {
        let json = serde_json::to_value(JwtConfig::new("hidden")).expect("serialize");
        assert!(json.get("secret").is_none());
    }
}
