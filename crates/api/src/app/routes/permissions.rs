//! Role-to-module permission rows (superadmin only).

use axum::{
    extract::Extension,
    routing::get,
    Router,
};

use nexgen_auth::{Permission, PermissionInput};
use nexgen_core::RoleId;

use crate::app::dto::PermissionsUpdate;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{Json, Path};
use crate::app::AppState;

pub fn router(state: &AppState) -> Router {
    let routes = Router::new().route("/role/:role_id", get(list_for_role).put(replace_for_role));
    super::superadmin_only(routes, state)
}

/// GET /permissions/role/:role_id
pub async fn list_for_role(
    Extension(state): Extension<AppState>,
    Path(role_id): Path<RoleId>,
) -> ApiResult<Json<Vec<Permission>>> {
    ensure_role(&state, role_id).await?;
    Ok(Json(state.stores.permissions.list_for_role(role_id).await?))
}

/// PUT /permissions/role/:role_id
///
/// Upserts one row per entry. Entries naming a module that does not exist are
/// skipped; every row is written for the path role.
pub async fn replace_for_role(
    Extension(state): Extension<AppState>,
    Path(role_id): Path<RoleId>,
    Json(body): Json<PermissionsUpdate>,
) -> ApiResult<Json<Vec<Permission>>> {
    if body.role_id != role_id {
        return Err(ApiError::BadRequest("role_id mismatch".into()));
    }
    ensure_role(&state, role_id).await?;

    let mut written = Vec::with_capacity(body.permissions.len());
    for entry in body.permissions {
        if state.stores.modules.get(entry.module_id).await?.is_none() {
            tracing::debug!(module_id = %entry.module_id, "skipping permission for unknown module");
            continue;
        }
        let input = PermissionInput { role_id, ..entry };
        written.push(state.stores.permissions.upsert(&input).await?);
    }

    tracing::info!(role_id = %role_id, rows = written.len(), "permissions updated");
    Ok(Json(written))
}

async fn ensure_role(state: &AppState, role_id: RoleId) -> ApiResult<()> {
    match state.stores.roles.get(role_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("Role")),
    }
}
