use axum::{
    extract::Extension,
    http::StatusCode,
    routing::get,
    Router,
};

use nexgen_auth::{Module, NewModule};
use nexgen_infra::StoreError;

use crate::app::dto::ListQuery;
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{Json, Query};
use crate::app::AppState;

pub fn router(state: &AppState) -> Router {
    super::superadmin_only(Router::new().route("/", get(list_modules).post(create_module)), state)
}

/// POST /modules
pub async fn create_module(
    Extension(state): Extension<AppState>,
    Json(body): Json<NewModule>,
) -> ApiResult<(StatusCode, Json<Module>)> {
    let module = state.stores.modules.create(body.validate()?).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::BadRequest("Module already exists".into()),
        other => other.into(),
    })?;
    tracing::info!(module_id = %module.id, name = %module.name, "module created");
    Ok((StatusCode::CREATED, Json(module)))
}

/// GET /modules?skip&limit
pub async fn list_modules(
    Extension(state): Extension<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<Module>>> {
    Ok(Json(state.stores.modules.list(q.page()).await?))
}
