//! Per-request security context.
//!
//! A [`SecurityContext`] is constructed once per request from the resolved
//! [`AuthenticationState`] and passed by reference to every authorization
//! call. There is no global holder: two requests never share a context.
//!
//! Operations fall into three groups:
//! - resolvers (`current_*`, `is_authenticated`) read the principal
//! - evaluators (`is_super_admin`, `is_root`, ...) answer role questions
//! - guards (`assert_*`) return `Ok(())` or an [`AccessError`]
//!
//! Every evaluator and guard needs a principal, so an unauthenticated or
//! anonymous context fails them with `AccessError::Unauthorized`.

use keystone_core::{RoleId, RolePermissionResourceId, UserId};
use tracing::{debug, warn};

use crate::auth::{AuthenticationEvent, AuthenticationState};
use crate::error::{AccessError, ForbiddenReason, UnauthorizedReason};
use crate::permission::PermissionResource;
use crate::principal::Principal;
use crate::role::{Role, RoleSet};
use crate::visibility::FieldVisibility;

/// The authorization view of a single request.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    state: AuthenticationState,
}

impl SecurityContext {
    /// Creates a context from an already resolved state.
    #[must_use]
    pub fn new(state: AuthenticationState) -> Self {
        Self { state }
    }

    /// Resolves an inbound authentication event into a context.
    #[must_use]
    pub fn from_event(event: Option<AuthenticationEvent>) -> Self {
        Self::new(AuthenticationState::resolve(event))
    }

    /// Creates a context for a verified principal.
    #[must_use]
    pub fn authenticated(principal: Principal) -> Self {
        Self::new(AuthenticationState::authenticated(principal))
    }

    /// Creates a context for a request without credentials.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(AuthenticationState::Unauthenticated)
    }

    #[must_use]
    pub fn state(&self) -> &AuthenticationState {
        &self.state
    }

    // --- resolvers ---

    /// Returns the principal for this request.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the request is unauthenticated or anonymous.
    pub fn current_principal(&self) -> Result<&Principal, AccessError> {
        match &self.state {
            AuthenticationState::Authenticated(principal) => Ok(principal.as_ref()),
            AuthenticationState::Anonymous => {
                debug!("anonymous caller has no principal");
                Err(AccessError::unauthorized(UnauthorizedReason::Anonymous))
            }
            AuthenticationState::Unauthenticated => {
                debug!("no authentication present");
                Err(AccessError::unauthorized(UnauthorizedReason::Unauthenticated))
            }
        }
    }

    /// Returns true only when a verified principal is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    #[must_use]
    pub fn is_not_authenticated(&self) -> bool {
        !self.is_authenticated()
    }

    /// Fails unless a verified principal is present.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the request is unauthenticated or anonymous.
    pub fn assert_authenticated(&self) -> Result<(), AccessError> {
        self.current_principal().map(|_| ())
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn current_user_id(&self) -> Result<UserId, AccessError> {
        self.current_principal().map(Principal::id)
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn current_roles(&self) -> Result<&RoleSet, AccessError> {
        self.current_principal().map(Principal::roles)
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn current_role_ids(&self) -> Result<Vec<RoleId>, AccessError> {
        self.current_roles().map(RoleSet::ids)
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn current_permission_resources(&self) -> Result<&[PermissionResource], AccessError> {
        self.current_principal().map(Principal::permission_resources)
    }

    // --- role hierarchy ---

    /// Returns true if the principal holds a SUPER_ADMIN or ROOT role.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_super_admin(&self) -> Result<bool, AccessError> {
        self.current_principal().map(Principal::is_super_admin)
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_not_super_admin(&self) -> Result<bool, AccessError> {
        self.is_super_admin().map(|admin| !admin)
    }

    /// Returns true if the principal holds a ROOT role.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_root(&self) -> Result<bool, AccessError> {
        self.current_principal().map(Principal::is_root)
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_not_root(&self) -> Result<bool, AccessError> {
        self.is_root().map(|root| !root)
    }

    /// Returns true if the principal's role with this id is ROOT.
    ///
    /// A role the principal does not hold is "not root"; use
    /// [`Self::find_role`] to tell that case apart.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_root_role(&self, role_id: RoleId) -> Result<bool, AccessError> {
        let principal = self.current_principal()?;
        let root = principal.is_root_role(role_id);
        if !root && principal.find_role(role_id).is_none() {
            debug!(%role_id, "role not held, treating as not root");
        }
        Ok(root)
    }

    /// Looks up one of the principal's roles.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn find_role(&self, role_id: RoleId) -> Result<Option<&Role>, AccessError> {
        Ok(self.current_principal()?.find_role(role_id))
    }

    // --- ownership ---

    /// Returns true if `user_id` is the principal's own id.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_current_user(&self, user_id: UserId) -> Result<bool, AccessError> {
        Ok(self.current_user_id()? == user_id)
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_not_current_user(&self, user_id: UserId) -> Result<bool, AccessError> {
        self.is_current_user(user_id).map(|own| !own)
    }

    /// Fails unless `user_id` is the principal's own id.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present, `Forbidden` when the id
    /// belongs to someone else.
    pub fn assert_current_user(&self, user_id: UserId) -> Result<(), AccessError> {
        let current = self.current_user_id()?;
        if current == user_id {
            return Ok(());
        }
        warn!(%current, target_user = %user_id, "refused access to another user");
        Err(AccessError::forbidden(ForbiddenReason::NotCurrentUser))
    }

    /// Fails unless the principal is super-admin or root.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present, `Forbidden` otherwise.
    pub fn assert_super_admin(&self) -> Result<(), AccessError> {
        let principal = self.current_principal()?;
        if principal.is_super_admin() {
            return Ok(());
        }
        warn!(user_id = %principal.id(), "super admin required");
        Err(AccessError::forbidden(ForbiddenReason::NotSuperAdmin))
    }

    /// Fails unless the principal is root.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present, `Forbidden` otherwise.
    pub fn assert_root(&self) -> Result<(), AccessError> {
        let principal = self.current_principal()?;
        if principal.is_root() {
            return Ok(());
        }
        warn!(user_id = %principal.id(), "root required");
        Err(AccessError::forbidden(ForbiddenReason::NotRoot))
    }

    /// Fails unless the binding is one of the principal's own.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present, `Forbidden` when the
    /// binding is not held.
    pub fn assert_owns_role_permission_resource(
        &self,
        id: RolePermissionResourceId,
    ) -> Result<(), AccessError> {
        let principal = self.current_principal()?;
        if principal.holds_role_permission_resource(id) {
            return Ok(());
        }
        warn!(user_id = %principal.id(), binding = %id, "binding not held by caller");
        Err(AccessError::forbidden(
            ForbiddenReason::NotOwnedRolePermissionResource,
        ))
    }

    /// Returns true if the role is assigned to the principal.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_current_user_role(&self, role_id: RoleId) -> Result<bool, AccessError> {
        Ok(self.current_principal()?.has_role(role_id))
    }

    /// # Errors
    ///
    /// `Unauthorized` when no principal is present.
    pub fn is_not_current_user_role(&self, role_id: RoleId) -> Result<bool, AccessError> {
        self.is_current_user_role(role_id).map(|held| !held)
    }

    /// Fails unless the role is assigned to the principal.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when no principal is present, `Forbidden` when the role
    /// is not held.
    pub fn assert_current_user_role(&self, role_id: RoleId) -> Result<(), AccessError> {
        let principal = self.current_principal()?;
        if principal.has_role(role_id) {
            return Ok(());
        }
        warn!(user_id = %principal.id(), %role_id, "role not held by caller");
        Err(AccessError::forbidden(ForbiddenReason::NotCurrentUserRole))
    }

    // --- visibility ---

    /// Resolves the field visibility that governs a request.
    ///
    /// Returns `None` when there is no principal or none of its bindings
    /// covers the method and path.
    #[must_use]
    pub fn visibility_for(&self, method: &str, path: &str) -> Option<FieldVisibility> {
        let principal = self.state.principal()?;
        let binding = principal.binding_for(method, path)?;
        debug!(
            user_id = %principal.id(),
            binding = %binding.id(),
            fields = binding.visible_fields(),
            "resolved field visibility"
        );
        Some(binding.visibility())
    }
}
