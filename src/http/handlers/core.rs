use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;

use crate::http::error::reply;
use crate::http::types::AppState;

pub async fn handle_health(State(state): State<AppState>) -> Response {
    reply(
        StatusCode::OK,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "database": state.store.path().to_string_lossy(),
        }),
    )
}
