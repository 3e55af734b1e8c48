//! Role types and the privilege hierarchy.
//!
//! Every role is classified by a [`RoleType`]. The classification is
//! ordered: `Root > SuperAdmin > Ordinary`. Both `Root` and `SuperAdmin`
//! count as super-admin for coarse checks, while root checks require
//! `Root` exactly.

use keystone_core::RoleId;
use serde::{Deserialize, Serialize};

/// Privilege classification of a role.
///
/// Variants are declared in ascending privilege so the derived ordering
/// matches the hierarchy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    /// A role with no administrative privilege.
    #[default]
    Ordinary,
    /// Administrator of the panel.
    SuperAdmin,
    /// The built-in owner of the installation.
    Root,
}

impl RoleType {
    /// Returns true for `SuperAdmin` and for `Root`, which implies it.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Root)
    }

    /// Returns true only for `Root`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }
}

/// A role assigned to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    id: RoleId,
    name: String,
    #[serde(default)]
    role_type: RoleType,
}

impl Role {
    /// Creates a new role.
    #[must_use]
    pub fn new(id: RoleId, name: impl Into<String>, role_type: RoleType) -> Self {
        Self {
            id,
            name: name.into(),
            role_type,
        }
    }

    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn role_type(&self) -> RoleType {
        self.role_type
    }

    /// Returns true if this role is super-admin-equivalent.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role_type.is_super_admin()
    }

    /// Returns true if this role is exactly ROOT.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.role_type.is_root()
    }
}

/// The set of roles held by a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: Vec<Role>,
}

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn none() -> Self {
        Self { roles: Vec::new() }
    }

    /// Creates a role set from the given roles.
    #[must_use]
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }

    /// Returns true if any role is SUPER_ADMIN or ROOT.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.roles.iter().any(Role::is_super_admin)
    }

    /// Returns true if any role is exactly ROOT.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.roles.iter().any(Role::is_root)
    }

    /// Finds the first held role with the given id.
    ///
    /// `None` means the role is not held at all, which callers can tell
    /// apart from a held role of a lower type.
    #[must_use]
    pub fn find(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.iter().find(|role| role.id() == role_id)
    }

    /// Returns true if the held role with this id is ROOT.
    ///
    /// A role that is not held degrades to "not root".
    #[must_use]
    pub fn is_root_role(&self, role_id: RoleId) -> bool {
        self.find(role_id).is_some_and(Role::is_root)
    }

    /// Returns true if a role with this id is held.
    #[must_use]
    pub fn contains(&self, role_id: RoleId) -> bool {
        self.find(role_id).is_some()
    }

    /// Returns the highest classification held, if any role is held.
    #[must_use]
    pub fn highest(&self) -> Option<RoleType> {
        self.roles.iter().map(Role::role_type).max()
    }

    /// Returns the ids of all held roles, in assignment order.
    #[must_use]
    pub fn ids(&self) -> Vec<RoleId> {
        self.roles.iter().map(Role::id).collect()
    }

    /// Returns the roles as a slice.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self {
            roles: iter.into_iter().collect(),
        }
    }
}
