//! `/api/v1` routes.
//!
//! Placeholder business surface; it exists so the service has parameterised
//! routes behind the same middleware stack as the ops endpoints.

use axum::{
    extract::Path,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/users/:id", get(get_user))
        .route("/echo", post(echo))
}

async fn ping() -> Json<Value> {
    Json(json!({ "pong": true }))
}

async fn get_user(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "id": id }))
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}
