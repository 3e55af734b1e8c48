//! Error types for the access crate.
//!
//! Every guard either returns normally or fails with exactly one of:
//! - `AccessError::Unauthorized`: no resolvable identity, the caller must
//!   authenticate again
//! - `AccessError::Forbidden`: identity known, privilege or ownership missing

use std::fmt;

/// Why no principal could be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnauthorizedReason {
    /// No authentication was presented, or it did not verify.
    Unauthenticated,
    /// The caller is the identity framework's anonymous user.
    Anonymous,
}

impl UnauthorizedReason {
    /// Returns the stable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Anonymous => "anonymous",
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "no authentication present",
            Self::Anonymous => "anonymous caller has no principal",
        }
    }
}

impl fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Why an authenticated principal was refused.
///
/// `code()` is stable and safe to hand to clients; `message()` is the
/// human-readable explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForbiddenReason {
    /// The target user is someone other than the principal.
    NotCurrentUser,
    /// The principal holds neither a SUPER_ADMIN nor a ROOT role.
    NotSuperAdmin,
    /// The principal does not hold a ROOT role.
    NotRoot,
    /// The role-permission-resource binding is not one of the principal's.
    NotOwnedRolePermissionResource,
    /// The role is not assigned to the principal.
    NotCurrentUserRole,
}

impl ForbiddenReason {
    /// Returns the stable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotCurrentUser => "not_current_user",
            Self::NotSuperAdmin => "not_super_admin",
            Self::NotRoot => "not_root",
            Self::NotOwnedRolePermissionResource => "not_owned_role_permission_resource",
            Self::NotCurrentUserRole => "not_current_user_role",
        }
    }

    /// Returns the human-readable reason.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotCurrentUser => "illegal privilege escalation, not the current user",
            Self::NotSuperAdmin => "not a super administrator, operation not permitted",
            Self::NotRoot => "not ROOT, operation not permitted",
            Self::NotOwnedRolePermissionResource => {
                "illegal privilege escalation, role permission resource is not held by the current user"
            }
            Self::NotCurrentUserRole => "illegal privilege escalation, not a role of the current user",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors from resolving the principal or evaluating a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No identity could be resolved for the request.
    Unauthorized { reason: UnauthorizedReason },
    /// The identity was resolved but lacks the required privilege.
    Forbidden { reason: ForbiddenReason },
}

impl AccessError {
    /// Creates an `Unauthorized` error with the given reason.
    #[must_use]
    pub fn unauthorized(reason: UnauthorizedReason) -> Self {
        Self::Unauthorized { reason }
    }

    /// Creates a `Forbidden` error with the given reason.
    #[must_use]
    pub fn forbidden(reason: ForbiddenReason) -> Self {
        Self::Forbidden { reason }
    }

    /// Returns the stable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { reason } => reason.code(),
            Self::Forbidden { reason } => reason.code(),
        }
    }

    /// Returns true for `Unauthorized`.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns true for `Forbidden`.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { reason } => {
                write!(f, "unauthorized: {reason}")
            }
            Self::Forbidden { reason } => {
                write!(f, "forbidden: {reason}")
            }
        }
    }
}

impl std::error::Error for AccessError {}
