//! Security context middleware and extractors for Axum.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use keystone_access::{SecurityContext, visibility};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Extractor for the request's security context.
///
/// Never rejects: a request without valid credentials yields an
/// unauthenticated context, and the guards called on it fail with
/// `Unauthorized`.
#[derive(Debug, Clone)]
pub struct Secured(pub SecurityContext);

impl<S> FromRequestParts<S> for Secured
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let context = parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .unwrap_or_default();
        Ok(Secured(context))
    }
}

/// Resolves the security context and binds the request's field visibility.
///
/// The visibility binding ends with the inner service's future, whether it
/// completes, fails or is dropped.
pub async fn security_context(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = resolve(&state, request.headers()).await;
    let visibility = context.visibility_for(request.method().as_str(), request.uri().path());
    request.extensions_mut().insert(context);
    visibility::scope(visibility, next.run(request)).await
}

/// Extracts the token from the configured header, stripping `Bearer `.
pub(crate) fn header_token<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?.trim_start();
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> SecurityContext {
    let Some(token) = header_token(headers, state.token_header()) else {
        return SecurityContext::unauthenticated();
    };

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(report) => {
            debug!(error = %report, "ignoring unverifiable token");
            return SecurityContext::unauthenticated();
        }
    };

    let principal = match state.authenticator.load_principal(&claims.sub).await {
        Ok(Some(principal)) => principal,
        Ok(None) => {
            debug!(user = %claims.sub, "token subject no longer exists");
            return SecurityContext::unauthenticated();
        }
        Err(report) => {
            error!(error = %report, "failed to load principal");
            return SecurityContext::unauthenticated();
        }
    };

    if principal.id() != claims.uid || !principal.is_enabled() {
        warn!(user = %claims.sub, "token does not match an active account");
        return SecurityContext::unauthenticated();
    }

    let issued_before_reset = principal
        .last_password_reset_date()
        .is_some_and(|reset| !claims.created_after(reset));
    if issued_before_reset {
        debug!(user = %claims.sub, "token predates credential reset");
        return SecurityContext::unauthenticated();
    }

    SecurityContext::authenticated(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let with_prefix = headers("authorization", "Bearer abc.def.ghi");
        let without_prefix = headers("authorization", "abc.def.ghi");

        assert_eq!(header_token(&with_prefix, "Authorization"), Some("abc.def.ghi"));
        assert_eq!(header_token(&without_prefix, "Authorization"), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_empty_header_has_no_token() {
        assert_eq!(header_token(&HeaderMap::new(), "Authorization"), None);
        assert_eq!(header_token(&headers("authorization", "Bearer "), "Authorization"), None);
    }

    #[test]
    fn custom_header_name_is_honored() {
        let headers = headers("x-auth-token", "abc");
        assert_eq!(header_token(&headers, "X-Auth-Token"), Some("abc"));
        assert_eq!(header_token(&headers, "Authorization"), None);
    }
}
