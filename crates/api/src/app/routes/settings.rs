//! User management for the settings screen, open to the roles listed for
//! `/settings` in the route access table.

use axum::{
    extract::Extension,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};

use nexgen_auth::{CreateUser, SystemRole};

use crate::app::dto::{users_out, ListQuery, UserOut};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{Json, Query};
use crate::app::AppState;
use crate::context::CurrentUser;
use crate::middleware::settings_access_guard;

pub fn router(state: &AppState) -> Router {
    let routes = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route_layer(from_fn_with_state(state.clone(), settings_access_guard));
    super::authenticated(routes, state)
}

/// GET /settings/users
pub async fn list_users(
    Extension(state): Extension<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<UserOut>>> {
    let users = state.stores.users.list(q.page()).await?;
    Ok(Json(users_out(&users)))
}

/// POST /settings/users
///
/// Only superadmins may create superadmin accounts from here.
pub async fn create_user(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<UserOut>)> {
    let elevated = body.is_superadmin || body.role == SystemRole::SuperAdmin.id();
    if elevated && !current.principal().has_superadmin_rights() {
        return Err(ApiError::Forbidden("Superadmin access required".into()));
    }
    let user = super::users::register(&state, body).await?;
    Ok((StatusCode::CREATED, Json(UserOut::from(&user))))
}
