use axum::{middleware::from_fn_with_state, Extension, Router};

use crate::app::AppState;
use crate::middleware::auth_middleware;

pub mod auth;
pub mod modules;
pub mod permissions;
pub mod requisitions;
pub mod roles;
pub mod settings;
pub mod system;
pub mod users;

/// Everything under `/api/v1`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/auth", auth::router(&state))
        .nest("/users", users::router(&state))
        .nest("/roles", roles::router(&state))
        .nest("/modules", modules::router(&state))
        .nest("/permissions", permissions::router(&state))
        .nest("/settings", settings::router(&state))
        .nest("/pr", requisitions::router(&state))
        .layer(Extension(state))
}

/// Require a valid token. Applied with `route_layer` so unmatched paths stay 404.
pub(crate) fn authenticated(router: Router, state: &AppState) -> Router {
    router.route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

/// Require a valid token from a superadmin.
pub(crate) fn superadmin_only(router: Router, state: &AppState) -> Router {
    authenticated(
        router.route_layer(axum::middleware::from_fn(crate::middleware::require_superadmin_guard)),
        state,
    )
}
