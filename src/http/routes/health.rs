//! GET /health - 健康检查

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::http::HttpServerState;

pub fn create_route() -> Router<HttpServerState> {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler(State(state): State<HttpServerState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "vendors": state.dispatcher.registry().vendors(),
    }))
}
