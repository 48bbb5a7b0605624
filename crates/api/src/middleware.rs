use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use nexgen_auth::{extract_bearer, require_active, require_superadmin};

use crate::app::errors::ApiError;
use crate::app::AppState;
use crate::context::CurrentUser;

/// Path key the settings routes are checked against in the route table.
pub const SETTINGS_PATH: &str = "/settings";

/// Resolve the bearer token to a live, active user and attach [`CurrentUser`].
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let authenticated = authenticate(&state, req.headers()).await;
    match authenticated {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| {
        tracing::warn!("missing or malformed authorization header");
        ApiError::credentials()
    })?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::warn!(error = %e, "token rejected");
        ApiError::from(e)
    })?;
    let user_id = claims.user_id().map_err(|e| {
        tracing::warn!(error = %e, "token subject rejected");
        ApiError::credentials()
    })?;

    let user = state.users.get(user_id).await?.ok_or_else(|| {
        tracing::warn!(%user_id, "token subject no longer exists");
        ApiError::credentials()
    })?;

    let current = CurrentUser::new(user);
    require_active(&current.principal())?;
    Ok(current)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    extract_bearer(value)
}

/// Runs after [`auth_middleware`]; rejects anyone without superadmin rights.
pub async fn require_superadmin_guard(req: Request, next: Next) -> Response {
    let Some(current) = req.extensions().get::<CurrentUser>() else {
        return ApiError::credentials().into_response();
    };
    if let Err(e) = require_superadmin(&current.principal()) {
        tracing::warn!(user_id = %current.user().id, "superadmin route denied");
        return ApiError::from(e).into_response();
    }
    next.run(req).await
}

/// Runs after [`auth_middleware`]; checks the role against the `/settings`
/// entry of the route access table.
pub async fn settings_access_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(current) = req.extensions().get::<CurrentUser>() else {
        return ApiError::credentials().into_response();
    };
    if let Err(e) = state.route_access.enforce_access(current.user().role, SETTINGS_PATH) {
        tracing::warn!(user_id = %current.user().id, role = %current.user().role, "settings access denied");
        return ApiError::from(e).into_response();
    }
    next.run(req).await
}
