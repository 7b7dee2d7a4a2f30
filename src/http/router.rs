use axum::body::Body;
use axum::http::Request;
use axum::routing::{any, get};
use axum::Router;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::handlers;
use super::types::AppState;

pub const GRADES_PATH: &str = "/nilaiMahasiswa";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(GRADES_PATH, any(handlers::grades::handle_nilai_mahasiswa))
        .route("/health", get(handlers::core::handle_health))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %req.method(),
                    uri = %req.uri(),
                )
            }),
        )
        .with_state(state)
}
