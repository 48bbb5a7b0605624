use axum::{http::StatusCode, routing::get, Json, Router};

use crate::app::dto::MessageOut;

pub fn router() -> Router {
    Router::new().route("/", get(root)).route("/health", get(health))
}

pub async fn root() -> Json<MessageOut> {
    Json(MessageOut {
        message: "NexGen ERP Backend",
    })
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}
