//! Router assembly.

use axum::{
    Router,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::{self, AppState};

/// Builds the application router.
///
/// The security context middleware wraps every route, so each handler sees
/// a resolved context and the request's field visibility.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/authentication",
            post(auth::login).put(auth::refresh_token),
        )
        .route("/me", get(api::me))
        .route("/users/{id}", get(api::get_user))
        .route("/roles/{id}", get(api::get_role))
        .route(
            "/role-permission-resources/{id}",
            delete(api::delete_role_permission_resource),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::security_context,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
