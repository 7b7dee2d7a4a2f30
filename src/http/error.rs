use axum::extract::rejection::QueryRejection;
use axum::http::header::ALLOW;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::db::StoreError;

pub const ALLOWED_METHODS: &str = "GET, POST, PATCH, DELETE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
    Delete,
}

impl WriteOp {
    fn code(self) -> &'static str {
        match self {
            WriteOp::Insert => "insert_failed",
            WriteOp::Update => "update_failed",
            WriteOp::Delete => "delete_failed",
        }
    }

    fn message(self) -> &'static str {
        match self {
            WriteOp::Insert => "Insert data failed",
            WriteOp::Update => "Update data failed",
            WriteOp::Delete => "Delete failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body is not valid JSON for this operation: {0}")]
    BadJson(#[source] serde_json::Error),

    #[error("query string could not be read: {0}")]
    BadQuery(#[source] QueryRejection),

    #[error("{op:?} statement failed: {source}")]
    Write {
        op: WriteOp,
        #[source]
        source: anyhow::Error,
    },

    #[error("grade read failed: {0}")]
    Read(#[source] anyhow::Error),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("store call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("method {0} is not allowed")]
    MethodNotAllowed(Method),
}

impl ApiError {
    pub fn write(op: WriteOp, err: StoreError) -> Self {
        match err {
            StoreError::Timeout(d) => ApiError::Timeout(d),
            StoreError::Failed(source) => ApiError::Write { op, source },
        }
    }

    pub fn read(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(d) => ApiError::Timeout(d),
            StoreError::Failed(source) => ApiError::Read(source),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadJson(_) | ApiError::BadQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Aggregate(AggregateError::Busy { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Write { .. } | ApiError::Read(_) | ApiError::Aggregate(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadJson(_) => "bad_json",
            ApiError::BadQuery(_) => "bad_query",
            ApiError::Aggregate(AggregateError::Busy { .. }) => "timeout",
            ApiError::Write { op, .. } => op.code(),
            ApiError::Read(_) | ApiError::Aggregate(_) => "read_failed",
            ApiError::Timeout(_) => "timeout",
            ApiError::MethodNotAllowed(_) => "method_not_allowed",
        }
    }

    /// Message sent to the client. Store internals stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadJson(_) => "JSON structure is not valid".to_string(),
            ApiError::BadQuery(_) => "Query string is not valid".to_string(),
            ApiError::Aggregate(AggregateError::Busy { .. }) => {
                "Store operation timed out".to_string()
            }
            ApiError::Write { op, .. } => op.message().to_string(),
            ApiError::Read(_) | ApiError::Aggregate(_) => "Reading grades failed".to_string(),
            ApiError::Timeout(_) => "Store operation timed out".to_string(),
            ApiError::MethodNotAllowed(m) => format!("Method {m} is not allowed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = ?self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let mut resp = reply(
            status,
            json!({
                "status": "error",
                "code": self.code(),
                "message": self.public_message(),
            }),
        );
        if matches!(self, ApiError::MethodNotAllowed(_)) {
            resp.headers_mut()
                .insert(ALLOW, axum::http::HeaderValue::from_static(ALLOWED_METHODS));
        }
        resp
    }
}

pub fn reply(status: StatusCode, payload: serde_json::Value) -> Response {
    (status, Json(payload)).into_response()
}

pub fn success() -> Response {
    reply(StatusCode::OK, json!({ "status": "success" }))
}
