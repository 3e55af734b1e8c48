//! Token claims and the device a token was issued to.

use chrono::{DateTime, Utc};
use keystone_core::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of client a token was issued to, carried as the token audience.
///
/// Mobile and tablet tokens stay refreshable after they expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Web,
    Mobile,
    Tablet,
    #[default]
    Unknown,
}

impl DeviceKind {
    /// Returns the audience string for this device.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Unknown => "unknown",
        }
    }

    /// Parses an optional device header, falling back to `Unknown`.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Returns true if tokens for this device may be refreshed after expiry.
    #[must_use]
    pub fn refreshable_after_expiry(&self) -> bool {
        matches!(self, Self::Mobile | Self::Tablet)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" | "normal" => Ok(Self::Web),
            "mobile" => Ok(Self::Mobile),
            "tablet" => Ok(Self::Tablet),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown device kind '{other}'")),
        }
    }
}

/// Claims carried by every keystone token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username.
    pub sub: String,
    /// Internal user id.
    pub uid: UserId,
    /// Audience: the device kind.
    pub aud: DeviceKind,
    /// Issuer.
    pub iss: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Token id.
    pub jti: String,
}

impl Claims {
    /// Creates claims issued at `now` and valid for `lifetime_secs`.
    ///
    /// The expiry saturates instead of overflowing.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        user_id: UserId,
        device: DeviceKind,
        issuer: impl Into<String>,
        now: DateTime<Utc>,
        lifetime_secs: i64,
    ) -> Self {
        let iat = now.timestamp();
        Self {
            sub: username.into(),
            uid: user_id,
            aud: device,
            iss: issuer.into(),
            iat,
            exp: iat.saturating_add(lifetime_secs),
            jti: ulid::Ulid::new().to_string(),
        }
    }

    /// Returns a copy re-issued at `now` with a new id and expiry.
    #[must_use]
    pub fn renewed(&self, now: DateTime<Utc>, lifetime_secs: i64) -> Self {
        Self::new(
            self.sub.clone(),
            self.uid,
            self.aud,
            self.iss.clone(),
            now,
            lifetime_secs,
        )
    }

    #[must_use]
    pub fn device(&self) -> DeviceKind {
        self.aud
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Returns true if the expiry is at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }

    /// Returns true if the expiry is more than `leeway_secs` before `now`,
    /// the same test the decoder applies.
    #[must_use]
    pub fn is_expired_with_leeway(&self, now: DateTime<Utc>, leeway_secs: u64) -> bool {
        let leeway = i64::try_from(leeway_secs).unwrap_or(i64::MAX);
        self.exp < now.timestamp().saturating_sub(leeway)
    }

    /// Returns true if the token was created at or after `reset`.
    ///
    /// Compared at second precision, so a token issued in the same second
    /// as the reset is still accepted.
    #[must_use]
    pub fn created_after(&self, reset: DateTime<Utc>) -> bool {
        self.iat >= reset.timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn device_header_parsing() {
        assert_eq!(DeviceKind::from_header(Some("Mobile")), DeviceKind::Mobile);
        assert_eq!(DeviceKind::from_header(Some(" tablet ")), DeviceKind::Tablet);
        assert_eq!(DeviceKind::from_header(Some("web")), DeviceKind::Web);
        assert_eq!(DeviceKind::from_header(Some("toaster")), DeviceKind::Unknown);
        assert_eq!(DeviceKind::from_header(None), DeviceKind::Unknown);
    }

    #[test]
    fn only_handheld_devices_outlive_expiry() {
        assert!(DeviceKind::Mobile.refreshable_after_expiry());
        assert!(DeviceKind::Tablet.refreshable_after_expiry());
        assert!(!DeviceKind::Web.refreshable_after_expiry());
        assert!(!DeviceKind::Unknown.refreshable_after_expiry());
    }

    #[test]
    fn audience_serializes_as_device_name() {
        let claims = Claims::new("alice", UserId::new(1), DeviceKind::Tablet, "keystone", Utc::now(), 60);
        let json = serde_json::to_value(&claims).expect("serialize");
        assert_eq!(json["aud"], "tablet");
        assert_eq!(json["uid"], 1);
        assert_eq!(json["sub"], "alice");
    }

    #[test]
    fn huge_lifetime_saturates_expiry() {
        let claims = Claims::new("alice", UserId::new(1), DeviceKind::Web, "keystone", Utc::now(), i64::MAX);
        assert_eq!(claims.exp, i64::MAX);
        assert!(!claims.is_expired_at(Utc::now()));
    }

    #[test]
    fn renewed_claims_keep_identity() {
        let issued = Utc::now() - Duration::days(2);
        let claims = Claims::new("alice", UserId::new(7), DeviceKind::Mobile, "keystone", issued, 3600);
        let renewed = claims.renewed(Utc::now(), 3600);

        assert_eq!(renewed.sub, claims.sub);
        assert_eq!(renewed.uid, claims.uid);
        assert_eq!(renewed.aud, claims.aud);
        assert!(renewed.iat > claims.iat);
        assert_ne!(renewed.jti, claims.jti);
        assert!(claims.is_expired_at(Utc::now()));
        assert!(!renewed.is_expired_at(Utc::now()));
    }

    #[test]
    fn creation_compared_against_reset() {
        let now = Utc::now();
        let claims = Claims::new("alice", UserId::new(7), DeviceKind::Web, "keystone", now, 60);

        assert!(claims.created_after(now - Duration::hours(1)));
        assert!(claims.created_after(now));
        assert!(!claims.created_after(now + Duration::hours(1)));
    }
}
