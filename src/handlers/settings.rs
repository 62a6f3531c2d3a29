//! Institution settings: one live row, read with GET and saved with PUT.

use super::body_to_record;
use crate::error::AppError;
use crate::response::{success_one, SuccessOne};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;

/// `data` is null until the first save.
pub async fn get(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(match state.settings.current().await? {
        Some(row) => success_one(row),
        None => (StatusCode::OK, Json(SuccessOne { data: Value::Null, meta: None })),
    })
}

pub async fn put(State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, AppError> {
    let row = state.settings.save(&body_to_record(body)?).await?;
    Ok(success_one(row))
}
