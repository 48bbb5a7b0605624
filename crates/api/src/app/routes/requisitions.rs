//! Purchase requisitions, gated by the role's `procurement` module permissions.

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use chrono::Utc;

use nexgen_auth::Action;
use nexgen_core::RequisitionId;
use nexgen_procurement::{Decision, RaiseRequisition, Requisition, RequisitionStatus};

use crate::app::dto::{DecisionOut, ListQuery};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{Json, Path, Query};
use crate::app::AppState;
use crate::authz::authorize_procurement;
use crate::context::CurrentUser;

pub fn router(state: &AppState) -> Router {
    let routes = Router::new()
        .route("/", get(list_requisitions).post(raise_requisition))
        .route("/:id", get(get_requisition))
        .route("/:id/approve", patch(approve))
        .route("/:id/reject", patch(reject));
    super::authenticated(routes, state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /pr
pub async fn raise_requisition(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<RaiseRequisition>,
) -> ApiResult<(StatusCode, Json<Requisition>)> {
    authorize_procurement(&state.stores, &current.principal(), Action::Edit).await?;

    let draft = body.into_draft(current.display_name(), Utc::now().date_naive())?;
    let pr = state.stores.requisitions.create(draft).await?;
    tracing::info!(pr_id = %pr.id, pr_number = %pr.pr_number, amount = pr.amount, "requisition raised");
    Ok((StatusCode::CREATED, Json(pr)))
}

/// GET /pr?skip&limit
pub async fn list_requisitions(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<Requisition>>> {
    authorize_procurement(&state.stores, &current.principal(), Action::View).await?;
    Ok(Json(state.stores.requisitions.list(q.page()).await?))
}

/// GET /pr/:id
pub async fn get_requisition(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<RequisitionId>,
) -> ApiResult<Json<Requisition>> {
    authorize_procurement(&state.stores, &current.principal(), Action::View).await?;
    Ok(Json(load(&state, id).await?))
}

/// PATCH /pr/:id/approve
pub async fn approve(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<RequisitionId>,
) -> ApiResult<Json<DecisionOut>> {
    decide(&state, &current, id, Decision::Approve).await.map(Json)
}

/// PATCH /pr/:id/reject
pub async fn reject(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<RequisitionId>,
) -> ApiResult<Json<DecisionOut>> {
    decide(&state, &current, id, Decision::Reject).await.map(Json)
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn decide(state: &AppState, current: &CurrentUser, id: RequisitionId, decision: Decision) -> ApiResult<DecisionOut> {
    authorize_procurement(&state.stores, &current.principal(), Action::Approve).await?;

    let pr = load(state, id).await?;
    let target = pr.decide(decision)?;

    // Another request may have decided it since the read.
    let pr = state
        .stores
        .requisitions
        .transition(id, RequisitionStatus::Pending, target)
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("requisition {} is no longer pending", pr.pr_number)))?;

    tracing::info!(pr_id = %id, status = %pr.status, decided_by = %current.user().id, "requisition decided");
    Ok(DecisionOut {
        message: decision.message(),
        pr,
    })
}

async fn load(state: &AppState, id: RequisitionId) -> ApiResult<Requisition> {
    state
        .stores
        .requisitions
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("PR not found".into()))
}
