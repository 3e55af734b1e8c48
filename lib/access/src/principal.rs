//! The resolved identity of a caller.
//!
//! A `Principal` is built once per authenticated request from verified token
//! claims and the identity store, and stays immutable for the request.

use chrono::{DateTime, Utc};
use keystone_core::{RoleId, RolePermissionResourceId, UserId};
use serde::{Deserialize, Serialize};

use crate::permission::{PermissionResource, RolePermissionResource};
use crate::role::{Role, RoleSet};

/// The authenticated user for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Internal user id.
    id: UserId,
    /// Login name, also the token subject.
    username: String,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    remark: Option<String>,
    /// When the credentials were last reset. Tokens created before this
    /// instant cannot be refreshed.
    #[serde(default)]
    last_password_reset_date: Option<DateTime<Utc>>,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
    #[serde(default)]
    roles: RoleSet,
    #[serde(default)]
    role_permission_resources: Vec<RolePermissionResource>,
    #[serde(default)]
    permission_resources: Vec<PermissionResource>,
}

fn default_enabled() -> bool {
    true
}

impl Principal {
    /// Creates an enabled principal with no roles or bindings.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            username: username.into(),
            nickname: None,
            email: None,
            enabled: true,
            remark: None,
            last_password_reset_date: None,
            create_time: now,
            update_time: now,
            roles: RoleSet::none(),
            role_permission_resources: Vec::new(),
            permission_resources: Vec::new(),
        }
    }

    /// Sets the assigned roles.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    /// Sets the role-permission-resource bindings.
    #[must_use]
    pub fn with_role_permission_resources(
        mut self,
        bindings: impl IntoIterator<Item = RolePermissionResource>,
    ) -> Self {
        self.role_permission_resources = bindings.into_iter().collect();
        self
    }

    /// Sets the permission resources reachable through the bindings.
    #[must_use]
    pub fn with_permission_resources(
        mut self,
        resources: impl IntoIterator<Item = PermissionResource>,
    ) -> Self {
        self.permission_resources = resources.into_iter().collect();
        self
    }

    /// Sets the credential reset instant.
    #[must_use]
    pub fn with_last_password_reset_date(mut self, reset: Option<DateTime<Utc>>) -> Self {
        self.last_password_reset_date = reset;
        self
    }

    #[must_use]
    pub fn with_nickname(mut self, nickname: Option<String>) -> Self {
        self.nickname = nickname;
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    #[must_use]
    pub fn last_password_reset_date(&self) -> Option<DateTime<Utc>> {
        self.last_password_reset_date
    }

    #[must_use]
    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    #[must_use]
    pub fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    #[must_use]
    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    #[must_use]
    pub fn role_permission_resources(&self) -> &[RolePermissionResource] {
        &self.role_permission_resources
    }

    #[must_use]
    pub fn permission_resources(&self) -> &[PermissionResource] {
        &self.permission_resources
    }

    /// Returns true if any role is SUPER_ADMIN or ROOT.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.roles.is_super_admin()
    }

    /// Returns true if any role is exactly ROOT.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.roles.is_root()
    }

    /// Returns true if the held role with this id is ROOT.
    #[must_use]
    pub fn is_root_role(&self, role_id: RoleId) -> bool {
        self.roles.is_root_role(role_id)
    }

    /// Finds one of the principal's roles by id.
    #[must_use]
    pub fn find_role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.find(role_id)
    }

    /// Returns true if the role is assigned to this principal.
    #[must_use]
    pub fn has_role(&self, role_id: RoleId) -> bool {
        self.roles.contains(role_id)
    }

    /// Returns true if the binding is one of this principal's own.
    #[must_use]
    pub fn holds_role_permission_resource(&self, id: RolePermissionResourceId) -> bool {
        self.role_permission_resources
            .iter()
            .any(|binding| binding.id() == id)
    }

    /// Removes one of the principal's bindings, returning it if it was held.
    pub fn remove_role_permission_resource(
        &mut self,
        id: RolePermissionResourceId,
    ) -> Option<RolePermissionResource> {
        let index = self
            .role_permission_resources
            .iter()
            .position(|binding| binding.id() == id)?;
        self.update_time = Utc::now();
        Some(self.role_permission_resources.remove(index))
    }

    /// Picks the binding that governs a request.
    ///
    /// The first permission resource matching the method and path selects
    /// the resource; the first binding for that resource wins.
    #[must_use]
    pub fn binding_for(&self, method: &str, path: &str) -> Option<&RolePermissionResource> {
        self.permission_resources
            .iter()
            .filter(|resource| resource.matches(method, path))
            .find_map(|resource| {
                self.role_permission_resources
                    .iter()
                    .find(|binding| binding.permission_resource_id() == resource.id())
            })
    }
}
