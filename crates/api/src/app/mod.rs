//! HTTP API application wiring (Axum router + state).
//!
//! - `state.rs`: shared state and backend selection
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: extractors whose rejections use those responses

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod state;

pub use state::{build_state, AppState, StartupError};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::system::router())
        .nest("/api/v1", routes::router(state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

