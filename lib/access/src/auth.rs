//! Authentication state for a request.
//!
//! The boundary hands over an [`AuthenticationEvent`] describing whatever
//! the verification step produced. It is interpreted exactly once, by
//! [`AuthenticationState::resolve`], into one of three states. Everything
//! downstream matches on the state instead of comparing sentinel strings.

use crate::principal::Principal;

/// Authority granted to anonymous callers by the identity framework.
pub const ANONYMOUS_AUTHORITY: &str = "ROLE_ANONYMOUS";

/// Principal name the identity framework uses for anonymous callers.
pub const ANONYMOUS_PRINCIPAL: &str = "anonymousUser";

/// Opaque outcome of credential or token verification.
#[derive(Debug, Clone)]
pub struct AuthenticationEvent {
    principal_name: String,
    authorities: Vec<String>,
    authenticated: bool,
    principal: Option<Principal>,
    /// Set when the principal came from our own token verification. The
    /// name and authorities then describe a real user, not the framework.
    verified_principal: bool,
}

impl AuthenticationEvent {
    /// Creates an event from raw verification output.
    #[must_use]
    pub fn new(principal_name: impl Into<String>, authorities: Vec<String>, authenticated: bool) -> Self {
        Self {
            principal_name: principal_name.into(),
            authorities,
            authenticated,
            principal: None,
            verified_principal: false,
        }
    }

    /// Creates a verified event carrying a principal.
    ///
    /// The anonymous sentinels are never matched against such an event, so
    /// a user or role that happens to share a sentinel's name still
    /// authenticates.
    #[must_use]
    pub fn authenticated(principal: Principal) -> Self {
        let authorities = principal
            .roles()
            .roles()
            .iter()
            .map(|role| role.name().to_string())
            .collect();
        Self {
            principal_name: principal.username().to_string(),
            authorities,
            authenticated: true,
            principal: Some(principal),
            verified_principal: true,
        }
    }

    /// Creates the event the identity framework emits for anonymous callers.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(
            ANONYMOUS_PRINCIPAL,
            vec![ANONYMOUS_AUTHORITY.to_string()],
            true,
        )
    }

    /// Attaches the resolved principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    #[must_use]
    pub fn principal_name(&self) -> &str {
        &self.principal_name
    }

    #[must_use]
    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn is_anonymous(&self) -> bool {
        if self.verified_principal {
            return false;
        }
        self.authorities.iter().any(|a| a == ANONYMOUS_AUTHORITY)
            || self.principal_name == ANONYMOUS_PRINCIPAL
    }
}

/// Exactly one of the three authentication states a request can be in.
#[derive(Debug, Clone, Default)]
pub enum AuthenticationState {
    /// No authentication was presented or it did not verify.
    #[default]
    Unauthenticated,
    /// The caller is the framework's anonymous identity.
    Anonymous,
    /// A verified principal.
    Authenticated(Box<Principal>),
}

impl AuthenticationState {
    /// Interprets an inbound event.
    ///
    /// Anonymous markers on a framework event win over its authenticated
    /// flag. An event
    /// that is not authenticated, or carries no principal, yields
    /// `Unauthenticated`.
    #[must_use]
    pub fn resolve(event: Option<AuthenticationEvent>) -> Self {
        let Some(event) = event else {
            return Self::Unauthenticated;
        };

        if event.is_anonymous() {
            return Self::Anonymous;
        }

        match (event.authenticated, event.principal) {
            (true, Some(principal)) => Self::Authenticated(Box::new(principal)),
            _ => Self::Unauthenticated,
        }
    }

    /// Creates an authenticated state directly.
    #[must_use]
    pub fn authenticated(principal: Principal) -> Self {
        Self::Authenticated(Box::new(principal))
    }

    /// Returns true only for a verified principal.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        match self {
            Self::Authenticated(_) => true,
            Self::Anonymous | Self::Unauthenticated => false,
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns the principal for an authenticated state.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal.as_ref()),
            Self::Anonymous | Self::Unauthenticated => None,
        }
    }
}
