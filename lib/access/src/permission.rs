//! Permission resources and role bindings.
//!
//! A [`PermissionResource`] names an API endpoint by method and URI
//! pattern. A [`RolePermissionResource`] binds one of the principal's roles
//! to a resource and records which response fields that role may see.

use keystone_core::{PermissionResourceId, RoleId, RolePermissionResourceId};
use serde::{Deserialize, Serialize};

use crate::visibility::FieldVisibility;

/// An API endpoint guarded by the permission system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResource {
    id: PermissionResourceId,
    name: String,
    /// URI pattern. `*` or `{name}` matches one segment, a trailing `**`
    /// matches the remainder.
    uri: String,
    /// HTTP method, `None` matches any method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
}

impl PermissionResource {
    /// Creates a permission resource.
    #[must_use]
    pub fn new(
        id: PermissionResourceId,
        name: impl Into<String>,
        uri: impl Into<String>,
        method: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            uri: uri.into(),
            method,
        }
    }

    #[must_use]
    pub fn id(&self) -> PermissionResourceId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Returns true if this resource covers the request.
    #[must_use]
    pub fn matches(&self, method: &str, path: &str) -> bool {
        if let Some(expected) = &self.method {
            if !expected.eq_ignore_ascii_case(method) {
                return false;
            }
        }
        uri_matches(&self.uri, path)
    }
}

fn uri_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.trim_matches('/').split('/').filter(|s| !s.is_empty());
    let mut path_segments = path.trim_matches('/').split('/').filter(|s| !s.is_empty());

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (Some("**"), _) => return true,
            (Some(expected), Some(actual)) => {
                let wildcard =
                    expected == "*" || (expected.starts_with('{') && expected.ends_with('}'));
                if !wildcard && expected != actual {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Grants a role access to a permission resource with a field filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionResource {
    id: RolePermissionResourceId,
    role_id: RoleId,
    permission_resource_id: PermissionResourceId,
    /// Field filter expression, see [`FieldVisibility::parse`].
    #[serde(default)]
    visible_fields: String,
}

impl RolePermissionResource {
    /// Creates a binding.
    #[must_use]
    pub fn new(
        id: RolePermissionResourceId,
        role_id: RoleId,
        permission_resource_id: PermissionResourceId,
        visible_fields: impl Into<String>,
    ) -> Self {
        Self {
            id,
            role_id,
            permission_resource_id,
            visible_fields: visible_fields.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> RolePermissionResourceId {
        self.id
    }

    #[must_use]
    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    #[must_use]
    pub fn permission_resource_id(&self) -> PermissionResourceId {
        self.permission_resource_id
    }

    #[must_use]
    pub fn visible_fields(&self) -> &str {
        &self.visible_fields
    }

    /// Parses the binding's field filter.
    #[must_use]
    pub fn visibility(&self) -> FieldVisibility {
        FieldVisibility::parse(&self.visible_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(uri: &str, method: Option<&str>) -> PermissionResource {
        PermissionResource::new(
            PermissionResourceId::new(1),
            "test",
            uri,
            method.map(str::to_string),
        )
    }

    #[test]
    fn exact_uri_matches() {
        let res = resource("/users", Some("GET"));
        assert!(res.matches("GET", "/users"));
        assert!(res.matches("get", "/users/"));
        assert!(!res.matches("POST", "/users"));
        assert!(!res.matches("GET", "/users/1"));
    }

    #[test]
    fn placeholder_matches_one_segment() {
        let res = resource("/users/{id}", None);
        assert!(res.matches("GET", "/users/42"));
        assert!(res.matches("DELETE", "/users/42"));
        assert!(!res.matches("GET", "/users"));
        assert!(!res.matches("GET", "/users/42/roles"));
    }

    #[test]
    fn star_matches_one_segment() {
        let res = resource("/roles/*/resources", Some("GET"));
        assert!(res.matches("GET", "/roles/5/resources"));
        assert!(!res.matches("GET", "/roles/5/users"));
    }

    #[test]
    fn double_star_matches_remainder() {
        let res = resource("/admin/**", None);
        assert!(res.matches("GET", "/admin"));
        assert!(res.matches("GET", "/admin/users/1/roles"));
        assert!(!res.matches("GET", "/public"));
    }

    #[test]
    fn binding_parses_visibility() {
        let binding = RolePermissionResource::new(
            RolePermissionResourceId::new(9),
            RoleId::new(1),
            PermissionResourceId::new(1),
            "*,-password",
        );
        let visibility = binding.visibility();
        assert!(visibility.is_wildcard());
        assert!(!visibility.exposes("password"));
        assert!(visibility.exposes("username"));
    }

    #[test]
    fn binding_deserializes_without_fields() {
        let json = r#"{"id": 3, "roleId": 1, "permissionResourceId": 2}"#;
        let binding: RolePermissionResource = serde_json::from_str(json).expect("deserialize");
        assert_eq!(binding.id(), RolePermissionResourceId::new(3));
        assert_eq!(binding.visible_fields(), "");
        assert!(binding.visibility().is_wildcard());
    }
}
