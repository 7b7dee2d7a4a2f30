use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::aggregate::aggregate;
use crate::db;
use crate::http::error::{success, ApiError, WriteOp};
use crate::http::types::{AppState, EnrollmentKey, EnrollmentWrite, ReadParams};

/// Single entry point for `/nilaiMahasiswa`; the HTTP method picks the operation.
pub async fn handle_nilai_mahasiswa(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let result = match method {
        Method::GET => match ReadParams::from_uri(&uri) {
            Ok(params) => read_grades(&state, params.nim()).await,
            Err(e) => Err(e),
        },
        Method::POST => create_grade(&state, &body).await,
        Method::PATCH => update_grade(&state, &body).await,
        Method::DELETE => delete_grade(&state, &body).await,
        other => Err(ApiError::MethodNotAllowed(other)),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::BadJson)
}

async fn read_grades(state: &AppState, nim: Option<&str>) -> Result<Response, ApiError> {
    let policy = state.on_row_error;
    let outcome = match nim {
        Some(nim) => {
            state
                .store
                .query(db::GRADES_ONE_SQL, [nim.to_string()], move |rows| {
                    aggregate(db::grade_rows(rows), policy)
                })
                .await
        }
        None => {
            state
                .store
                .query(db::GRADES_ALL_SQL, (), move |rows| {
                    aggregate(db::grade_rows(rows), policy)
                })
                .await
        }
    };
    let agg = outcome.map_err(ApiError::read)??;

    if let Some(cut) = &agg.truncated {
        tracing::warn!(
            nim = nim.unwrap_or("*"),
            rows_read = agg.rows_read,
            reason = %cut,
            "grade read stopped early; returning partial result"
        );
    }
    tracing::debug!(
        students = agg.students.len(),
        rows_read = agg.rows_read,
        "grades read"
    );
    Ok(Json(agg.students).into_response())
}

async fn create_grade(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let req: EnrollmentWrite = decode_body(body)?;
    let affected = state
        .store
        .execute(
            db::INSERT_GRADE_SQL,
            (req.nim.clone(), req.kode_mk.clone(), req.nilai),
        )
        .await
        .map_err(|e| ApiError::write(WriteOp::Insert, e))?;
    tracing::info!(nim = %req.nim, kode_mk = %req.kode_mk, affected, "grade inserted");
    Ok(success())
}

async fn update_grade(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let req: EnrollmentWrite = decode_body(body)?;
    let affected = state
        .store
        .execute(
            db::UPDATE_GRADE_SQL,
            (req.nilai, req.kode_mk.clone(), req.nim.clone()),
        )
        .await
        .map_err(|e| ApiError::write(WriteOp::Update, e))?;
    tracing::info!(nim = %req.nim, kode_mk = %req.kode_mk, affected, "grade updated");
    Ok(success())
}

async fn delete_grade(state: &AppState, body: &[u8]) -> Result<Response, ApiError> {
    let req: EnrollmentKey = decode_body(body)?;
    let affected = state
        .store
        .execute(db::DELETE_GRADE_SQL, (req.kode_mk.clone(), req.nim.clone()))
        .await
        .map_err(|e| ApiError::write(WriteOp::Delete, e))?;
    tracing::info!(nim = %req.nim, kode_mk = %req.kode_mk, affected, "grade deleted");
    Ok(success())
}
