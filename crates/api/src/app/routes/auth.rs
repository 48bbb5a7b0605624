//! Token issuance and the current-user endpoint.

use axum::{
    extract::Extension,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use chrono::Utc;

use nexgen_auth::{normalize_email, require_active, verify_password, IssuedToken, Principal, User};

use crate::app::dto::{LoginRequest, MeOut, TokenForm, UserOut};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::extract::{Form, Json};
use crate::app::AppState;
use crate::context::CurrentUser;
use crate::rate_limit::login_rate_limit;

pub fn router(state: &AppState) -> Router {
    let credentials = Router::new()
        .route("/token", post(token))
        .route("/login", post(login))
        .route_layer(from_fn_with_state(state.clone(), login_rate_limit));

    let me = super::authenticated(Router::new().route("/me", get(me)), state);

    credentials.merge(me)
}

/// POST /auth/token - OAuth2 password flow (`username` is the email)
pub async fn token(Extension(state): Extension<AppState>, Form(form): Form<TokenForm>) -> ApiResult<Json<IssuedToken>> {
    if let Some(grant) = form.grant_type.as_deref()
        && grant != "password"
    {
        return Err(ApiError::BadRequest(format!("unsupported grant_type: {grant}")));
    }
    issue_for_credentials(&state, &form.username, &form.password).await.map(Json)
}

/// POST /auth/login - JSON credentials
pub async fn login(Extension(state): Extension<AppState>, Json(body): Json<LoginRequest>) -> ApiResult<Json<IssuedToken>> {
    issue_for_credentials(&state, &body.email, &body.password).await.map(Json)
}

/// GET /auth/me
pub async fn me(Extension(state): Extension<AppState>, Extension(current): Extension<CurrentUser>) -> ApiResult<Json<MeOut>> {
    let user = current.user();
    let role_name = state.stores.roles.get(user.role).await?.map(|r| r.name);
    Ok(Json(MeOut {
        user: UserOut::from(user),
        role_name,
        accessible_paths: state.route_access.accessible_paths(user.role),
    }))
}

async fn issue_for_credentials(state: &AppState, email: &str, password: &str) -> ApiResult<IssuedToken> {
    let user = authenticate_user(state, email, password).await?.ok_or_else(|| {
        tracing::warn!("login failed: bad credentials");
        incorrect_credentials()
    })?;
    require_active(&Principal::from_user(&user))?;

    let issued = state.jwt.issue(&user, Utc::now())?;
    tracing::info!(user_id = %user.id, "access token issued");
    Ok(issued)
}

/// `Ok(None)` for an unknown email or a wrong password.
async fn authenticate_user(state: &AppState, email: &str, password: &str) -> ApiResult<Option<User>> {
    let Ok(email) = normalize_email(email) else {
        return Ok(None);
    };
    let Some(user) = state.stores.users.find_by_email(&email).await? else {
        return Ok(None);
    };
    match verify_password(password, &user.hashed_password) {
        Ok(true) => Ok(Some(user)),
        Ok(false) => Ok(None),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "stored password hash is unreadable");
            Ok(None)
        }
    }
}

fn incorrect_credentials() -> ApiError {
    ApiError::Unauthorized("Incorrect username or password".into())
}
