//! User administration (superadmin only).

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, patch},
    Router,
};

use nexgen_auth::{hash_password, CreateUser, UpdateUser, User, UserChanges};
use nexgen_core::UserId;
use nexgen_infra::StoreError;

use crate::app::dto::{users_out, AssignRoleRequest, ListQuery, UserOut};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{Json, Path, Query};
use crate::app::AppState;

pub fn router(state: &AppState) -> Router {
    let routes = Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user))
        .route("/:id/assign-role", patch(assign_role));
    super::superadmin_only(routes, state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /users
pub async fn create_user(
    Extension(state): Extension<AppState>,
    Json(body): Json<CreateUser>,
) -> ApiResult<(StatusCode, Json<UserOut>)> {
    let user = register(&state, body).await?;
    Ok((StatusCode::CREATED, Json(UserOut::from(&user))))
}

/// GET /users?skip&limit
pub async fn list_users(
    Extension(state): Extension<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<UserOut>>> {
    let users = state.stores.users.list(q.page()).await?;
    Ok(Json(users_out(&users)))
}

/// GET /users/:id
pub async fn get_user(Extension(state): Extension<AppState>, Path(id): Path<UserId>) -> ApiResult<Json<UserOut>> {
    let user = state.stores.users.get(id).await?.ok_or_else(user_not_found)?;
    Ok(Json(UserOut::from(&user)))
}

/// PATCH /users/:id
pub async fn update_user(
    Extension(state): Extension<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateUser>,
) -> ApiResult<Json<UserOut>> {
    let body = body.validate()?;
    let hashed = body.password.as_deref().map(hash_password).transpose()?;
    let changes = body.into_changes(hashed);

    let user = apply(&state, id, &changes).await?;
    tracing::info!(user_id = %id, "user updated");
    Ok(Json(UserOut::from(&user)))
}

/// PATCH /users/:id/assign-role
pub async fn assign_role(
    Extension(state): Extension<AppState>,
    Path(id): Path<UserId>,
    Json(body): Json<AssignRoleRequest>,
) -> ApiResult<Json<UserOut>> {
    let role_id = body
        .role_id
        .ok_or_else(|| ApiError::BadRequest("role_id required".into()))?;

    if state.stores.users.get(id).await?.is_none() {
        return Err(user_not_found());
    }
    if state.stores.roles.get(role_id).await?.is_none() {
        return Err(ApiError::not_found("Role"));
    }

    let changes = UserChanges {
        role: Some(role_id),
        ..UserChanges::default()
    };
    let user = apply(&state, id, &changes).await?;
    tracing::info!(user_id = %id, role = %role_id, "role assigned");
    Ok(Json(UserOut::from(&user)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared with the settings routes
// ─────────────────────────────────────────────────────────────────────────────

/// Validate, hash and insert a new account.
pub(crate) async fn register(state: &AppState, body: CreateUser) -> ApiResult<User> {
    let body = body.validate()?;
    let hashed = hash_password(&body.password)?;
    let user = state
        .stores
        .users
        .create(body.into_draft(hashed))
        .await
        .map_err(user_write_error)?;
    tracing::info!(user_id = %user.id, role = %user.role, "user created");
    Ok(user)
}

async fn apply(state: &AppState, id: UserId, changes: &UserChanges) -> ApiResult<User> {
    let updated = state
        .stores
        .users
        .update(id, changes)
        .await
        .map_err(user_write_error)?
        .ok_or_else(user_not_found)?;
    state.users.invalidate(id).await;
    Ok(updated)
}

fn user_write_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => ApiError::BadRequest("Email already exists".into()),
        StoreError::MissingReference(_) => ApiError::not_found("Role"),
        other => other.into(),
    }
}

fn user_not_found() -> ApiError {
    ApiError::not_found("User")
}
