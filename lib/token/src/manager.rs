//! Token issue, validation and refresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use keystone_access::Principal;
use keystone_core::Result;
use tracing::{debug, instrument};

use crate::claims::{Claims, DeviceKind};
use crate::config::JwtConfig;
use crate::error::TokenError;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Issues and verifies signed tokens.
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<JwtConfig>,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    /// Same checks as `validation` except expiry.
    lenient_validation: Arc<Validation>,
}

impl TokenManager {
    /// Creates a manager from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the configuration is unusable.
    pub fn new(config: JwtConfig) -> Result<Self, TokenError> {
        config.validate()?;

        let encoding_key = EncodingKey::from_secret(config.secret().as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret().as_bytes());

        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[config.issuer()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.validate_aud = false;
        validation.leeway = config.leeway_secs();

        let mut lenient_validation = validation.clone();
        lenient_validation.validate_exp = false;

        Ok(Self {
            config: Arc::new(config),
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
            lenient_validation: Arc::new(lenient_validation),
        })
    }

    #[must_use]
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Signs the given claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key).map_err(|e| {
            TokenError::Signing {
                details: e.to_string(),
            }
            .into()
        })
    }

    /// Issues a token for the principal on the given device.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    #[instrument(skip(self, principal), fields(user_id = %principal.id(), device = %device))]
    pub fn issue_token(
        &self,
        principal: &Principal,
        device: DeviceKind,
    ) -> Result<String, TokenError> {
        let claims = Claims::new(
            principal.username(),
            principal.id(),
            device,
            self.config.issuer(),
            Utc::now(),
            self.config.expiration_secs(),
        );
        let token = self.encode(&claims)?;
        debug!(jti = %claims.jti, "issued token");
        Ok(token)
    }

    /// Fully validates a token, including expiry.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` or `TokenError::InvalidToken`.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, &self.validation)
    }

    /// Returns the token's subject.
    ///
    /// The signature and issuer are verified, expiry is not, so the owner of
    /// an expired token can still be looked up for a refresh.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidToken` if the token does not verify.
    pub fn username_from_token(&self, token: &str) -> Result<String, TokenError> {
        self.decode_ignoring_expiry(token).map(|claims| claims.sub)
    }

    /// Returns true if the token may be exchanged for a new one.
    ///
    /// A token is refreshable when it was created at or after the last
    /// credential reset, and it is either unexpired or was issued to a
    /// mobile or tablet device. Tokens that do not verify are never
    /// refreshable.
    #[must_use]
    pub fn is_refresh_eligible(
        &self,
        token: &str,
        last_credential_reset: Option<DateTime<Utc>>,
    ) -> bool {
        let Ok(claims) = self.decode_ignoring_expiry(token) else {
            return false;
        };
        self.claims_refresh_eligible(&claims, last_credential_reset, Utc::now())
    }

    fn claims_refresh_eligible(
        &self,
        claims: &Claims,
        last_credential_reset: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let created_after_reset = last_credential_reset.is_none_or(|reset| claims.created_after(reset));
        let within_lifetime = !claims.is_expired_with_leeway(now, self.config.leeway_secs())
            || claims.device().refreshable_after_expiry();
        debug!(
            created_after_reset,
            within_lifetime,
            device = %claims.device(),
            "evaluated refresh eligibility"
        );
        created_after_reset && within_lifetime
    }

    /// Issues a replacement token with the same identity and device.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidToken` if the token does not verify, or
    /// `TokenError::NotRefreshable` if it is expired and was not issued to
    /// a mobile or tablet device.
    #[instrument(skip(self, token))]
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.decode_ignoring_expiry(token)?;
        let now = Utc::now();
        if !self.claims_refresh_eligible(&claims, None, now) {
            return Err(TokenError::NotRefreshable.into());
        }
        let renewed = claims.renewed(now, self.config.expiration_secs());
        let token = self.encode(&renewed)?;
        debug!(user = %renewed.sub, jti = %renewed.jti, "refreshed token");
        Ok(token)
    }

    fn decode_ignoring_expiry(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, &self.lenient_validation)
    }

    fn decode_with(&self, token: &str, validation: &Validation) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let error = match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::InvalidToken {
                        details: "signature mismatch".to_string(),
                    },
                    ErrorKind::InvalidIssuer => TokenError::InvalidToken {
                        details: "unexpected issuer".to_string(),
                    },
                    _ => TokenError::InvalidToken {
                        details: e.to_string(),
                    },
                };
                debug!(error = %error, "token rejected");
                error.into()
            })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.config.issuer())
            .field("expiration_secs", &self.config.expiration_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use keystone_core::UserId;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn manager() -> TokenManager {
        TokenManager::new(JwtConfig::new(SECRET)).expect("manager")
    }

    fn principal() -> Principal {
        Principal::new(UserId::new(42), "alice")
    }

    fn claims_issued(at: DateTime<Utc>, lifetime_secs: i64, device: DeviceKind) -> Claims {
        Claims::new("alice", UserId::new(42), device, "keystone", at, lifetime_secs)
    }

    #[test]
    fn issued_token_validates() {
        let manager = manager();
        let token = manager
            .issue_token(&principal(), DeviceKind::Web)
            .expect("issue");

        let claims = manager.validate(&token).expect("validate");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.uid, UserId::new(42));
        assert_eq!(claims.device(), DeviceKind::Web);
        assert_eq!(manager.username_from_token(&token).expect("username"), "alice");
    }

    #[test]
    fn tampered_token_is_invalid() {
        let manager = manager();
        let token = manager
            .issue_token(&principal(), DeviceKind::Web)
            .expect("issue");
        let other = TokenManager::new(JwtConfig::new("another-secret-another-secret-xx"))
            .expect("manager");

        let err = other.validate(&token).expect_err("foreign signature");
        assert!(matches!(err.current_context(), TokenError::InvalidToken { .. }));
        assert!(!other.is_refresh_eligible(&token, None));
        assert!(manager.validate("not.a.token").is_err());
    }

    #[test]
    fn foreign_issuer_is_invalid() {
        let foreign = TokenManager::new(JwtConfig::new(SECRET).with_issuer("elsewhere"))
            .expect("manager");
        let token = foreign
            .issue_token(&principal(), DeviceKind::Web)
            .expect("issue");

        assert!(manager().validate(&token).is_err());
    }

    #[test]
    fn expired_token_fails_validation_but_keeps_username() {
        let manager = manager();
        let token = manager
            .encode(&claims_issued(Utc::now() - Duration::days(10), 3600, DeviceKind::Web))
            .expect("encode");

        let err = manager.validate(&token).expect_err("expired");
        assert_eq!(err.current_context(), &TokenError::Expired);
        assert_eq!(manager.username_from_token(&token).expect("username"), "alice");
    }

    #[test]
    fn fresh_token_is_refresh_eligible() {
        let manager = manager();
        let token = manager
            .issue_token(&principal(), DeviceKind::Web)
            .expect("issue");

        assert!(manager.is_refresh_eligible(&token, None));
        assert!(manager.is_refresh_eligible(&token, Some(Utc::now() - Duration::hours(1))));
    }

    #[test]
    fn token_created_before_reset_is_not_eligible() {
        let manager = manager();
        let token = manager
            .encode(&claims_issued(Utc::now() - Duration::hours(2), 86_400, DeviceKind::Mobile))
            .expect("encode");

        assert!(!manager.is_refresh_eligible(&token, Some(Utc::now() - Duration::hours(1))));
        assert!(manager.is_refresh_eligible(&token, Some(Utc::now() - Duration::hours(3))));
    }

    #[test]
    fn expired_web_token_is_not_eligible() {
        let manager = manager();
        let token = manager
            .encode(&claims_issued(Utc::now() - Duration::days(10), 3600, DeviceKind::Web))
            .expect("encode");

        assert!(!manager.is_refresh_eligible(&token, None));
        let err = manager.refresh(&token).expect_err("not refreshable");
        assert_eq!(err.current_context(), &TokenError::NotRefreshable);
    }

    #[test]
    fn web_token_within_leeway_is_refreshable() {
        let manager = manager();
        let token = manager
            .encode(&claims_issued(Utc::now() - Duration::seconds(3630), 3600, DeviceKind::Web))
            .expect("encode");

        assert!(manager.validate(&token).is_ok());
        assert!(manager.is_refresh_eligible(&token, None));
        assert!(manager.refresh(&token).is_ok());
    }

    #[test]
    fn expired_handheld_token_stays_eligible() {
        let manager = manager();
        for device in [DeviceKind::Mobile, DeviceKind::Tablet] {
            let token = manager
                .encode(&claims_issued(Utc::now() - Duration::days(10), 3600, device))
                .expect("encode");
            assert!(manager.is_refresh_eligible(&token, None));
        }
    }

    #[test]
    fn refresh_reissues_with_same_identity() {
        let manager = manager();
        let original = claims_issued(Utc::now() - Duration::days(10), 3600, DeviceKind::Tablet);
        let token = manager.encode(&original).expect("encode");

        let refreshed = manager.refresh(&token).expect("refresh");
        let claims = manager.validate(&refreshed).expect("validate");

        assert_eq!(claims.sub, original.sub);
        assert_eq!(claims.uid, original.uid);
        assert_eq!(claims.device(), DeviceKind::Tablet);
        assert!(claims.iat > original.iat);
        assert_ne!(claims.jti, original.jti);
    }
}
