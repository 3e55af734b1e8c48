//! Authentication routes for login and token refresh.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use keystone_access::{FieldVisibility, Principal};
use keystone_token::DeviceKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::{AppState, DEVICE_TYPE_HEADER, middleware::header_token};
use crate::error::{ApiError, INVALID_ORIGINAL_TOKEN};

/// Fields of a user record that never leave the server.
const HIDDEN_USER_FIELDS: &str =
    "*,-password,-passwordHash,-lastPasswordResetDate,-createTime,-updateTime,-remark,-enabled";

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    user: Value,
}

/// Refresh response body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    token: String,
}

/// Serializes a principal without its internal bookkeeping fields.
pub(crate) fn sanitized_user(principal: &Principal) -> Result<Value, ApiError> {
    let value = serde_json::to_value(principal).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize principal");
        ApiError::Internal
    })?;
    Ok(FieldVisibility::parse(HIDDEN_USER_FIELDS).filtered(&value))
}

/// Verifies credentials and issues a token for the caller's device.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let device = DeviceKind::from_header(
        headers
            .get(DEVICE_TYPE_HEADER)
            .and_then(|value| value.to_str().ok()),
    );

    let principal = state
        .authenticator
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state.tokens.issue_token(&principal, device)?;

    info!(user_id = %principal.id(), %device, "login succeeded");
    Ok(Json(LoginResponse {
        token,
        user: sanitized_user(&principal)?,
    }))
}

/// Exchanges a refreshable token for a new one.
///
/// Any token that is missing, unverifiable, belongs to an unknown user or
/// is not refresh-eligible yields `400 original token is invalid`.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let invalid = || ApiError::bad_request(INVALID_ORIGINAL_TOKEN);

    let token = header_token(&headers, state.token_header()).ok_or_else(invalid)?;
    let username = state
        .tokens
        .username_from_token(token)
        .map_err(|_| invalid())?;
    let principal = state
        .authenticator
        .load_principal(&username)
        .await?
        .ok_or_else(invalid)?;

    if !principal.is_enabled()
        || !state
            .tokens
            .is_refresh_eligible(token, principal.last_password_reset_date())
    {
        debug!(user = %username, "refresh refused");
        return Err(invalid());
    }

    let token = state.tokens.refresh(token)?;
    Ok(Json(TokenResponse { token }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::UserId;

    #[test]
    fn sanitized_user_drops_internal_fields() {
        let principal = Principal::new(UserId::new(42), "alice")
            .with_email(Some("alice@example.com".to_string()))
            .with_last_password_reset_date(Some(chrono::Utc::now()));
        let user = sanitized_user(&principal).expect("sanitized");

        assert_eq!(user["id"], 42);
        assert_eq!(user["username"], "alice");
        assert_eq!(user["email"], "alice@example.com");
        for hidden in ["lastPasswordResetDate", "createTime", "updateTime", "remark", "enabled"] {
            assert!(user.get(hidden).is_none(), "{hidden} should be hidden");
        }
    }
}
