//! Typed errors and HTTP mapping.

use crate::store::{StoreError, StoreErrorKind};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("reserved column {column} redeclared on table {table}")]
    ReservedColumn { table: String, column: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    /// Caller input broke a business rule; raised before any store call.
    #[error("validation: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Store(e) => match e.kind {
                StoreErrorKind::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
                StoreErrorKind::Constraint => (StatusCode::CONFLICT, "conflict"),
                StoreErrorKind::MissingTable | StoreErrorKind::MissingColumn => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "schema_mismatch")
                }
                StoreErrorKind::Permission => (StatusCode::FORBIDDEN, "permission_denied"),
                StoreErrorKind::Connection => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
                StoreErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, "invalid_input"),
                StoreErrorKind::Other => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            },
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
        };
        let details = match &self {
            AppError::Store(e) => Some(serde_json::json!({ "table": e.table, "kind": e.kind.as_str() })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
