use axum::{
    extract::Extension,
    http::StatusCode,
    routing::get,
    Router,
};

use nexgen_auth::{NewRole, Role};
use nexgen_core::RoleId;
use nexgen_infra::StoreError;

use crate::app::dto::{ListQuery, RoleWithPermissions};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{Json, Path, Query};
use crate::app::AppState;

pub fn router(state: &AppState) -> Router {
    let routes = Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role));
    super::superadmin_only(routes, state)
}

/// POST /roles
pub async fn create_role(
    Extension(state): Extension<AppState>,
    Json(body): Json<NewRole>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    let role = state.stores.roles.create(body.validate()?).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::BadRequest("Role already exists".into()),
        other => other.into(),
    })?;
    tracing::info!(role_id = %role.id, name = %role.name, "role created");
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /roles?skip&limit
pub async fn list_roles(Extension(state): Extension<AppState>, Query(q): Query<ListQuery>) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(state.stores.roles.list(q.page()).await?))
}

/// GET /roles/:id - role plus its permission rows
pub async fn get_role(
    Extension(state): Extension<AppState>,
    Path(id): Path<RoleId>,
) -> ApiResult<Json<RoleWithPermissions>> {
    let role = state.stores.roles.get(id).await?.ok_or_else(|| ApiError::not_found("Role"))?;
    let permissions = state.stores.permissions.list_for_role(id).await?;
    Ok(Json(RoleWithPermissions { role, permissions }))
}
