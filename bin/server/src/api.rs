//! Guarded administrative endpoints.
//!
//! Each handler runs its guards before touching any data. JSON bodies pass
//! through the request's field-visibility descriptor before they are sent.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use keystone_access::{Role, visibility};
use keystone_core::{RoleId, RolePermissionResourceId, UserId};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::auth::{AppState, Secured, routes::sanitized_user};
use crate::error::ApiError;

/// Applies the visibility bound to the current request, if any.
fn shaped(mut value: Value) -> Json<Value> {
    if let Some(visibility) = visibility::current() {
        visibility.apply(&mut value);
    }
    Json(value)
}

fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ApiError::bad_request(e.to_string()))
}

/// Returns the caller's own user record.
pub async fn me(Secured(ctx): Secured) -> Result<Json<Value>, ApiError> {
    let principal = ctx.current_principal()?;
    Ok(shaped(sanitized_user(principal)?))
}

/// Returns a user record. Callers may only read their own record unless
/// they are super-admin.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Secured(ctx): Secured,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let user_id: UserId = parse_id(&id)?;
    if ctx.is_not_super_admin()? {
        ctx.assert_current_user(user_id)?;
    }

    let principal = state
        .authenticator
        .load_principal_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user {user_id} not found")))?;
    Ok(shaped(sanitized_user(&principal)?))
}

#[derive(Debug, Serialize)]
struct RoleView<'a> {
    #[serde(flatten)]
    role: &'a Role,
    root: bool,
}

/// Returns one of the caller's own roles and whether it is ROOT.
pub async fn get_role(
    Secured(ctx): Secured,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let role_id: RoleId = parse_id(&id)?;
    ctx.assert_current_user_role(role_id)?;

    let role = ctx
        .find_role(role_id)?
        .ok_or_else(|| ApiError::not_found(format!("role {role_id} not found")))?;
    let view = RoleView {
        role,
        root: ctx.is_root_role(role_id)?,
    };
    let value = serde_json::to_value(view).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize role");
        ApiError::Internal
    })?;
    Ok(shaped(value))
}

/// Revokes one of the caller's own role-permission-resource bindings.
///
/// Requires super-admin and ownership of the binding. The binding is
/// removed from the directory, so later requests no longer hold it.
pub async fn delete_role_permission_resource(
    State(state): State<Arc<AppState>>,
    Secured(ctx): Secured,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let binding_id: RolePermissionResourceId = parse_id(&id)?;
    ctx.assert_owns_role_permission_resource(binding_id)?;
    ctx.assert_super_admin()?;

    let user_id = ctx.current_user_id()?;
    let revoked = state
        .authenticator
        .revoke_role_permission_resource(user_id, binding_id)
        .await?;
    if !revoked {
        return Err(ApiError::not_found(format!("binding {binding_id} not found")));
    }

    info!(%user_id, binding = %binding_id, "revoked binding");
    Ok(StatusCode::NO_CONTENT)
}
