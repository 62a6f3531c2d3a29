use super::{body_to_record, parse_filters, parse_id};
use crate::config::DOCUMENTS;
use crate::error::AppError;
use crate::response::{success_created, success_many, success_one};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let def = state.catalog.require(DOCUMENTS)?;
    let rows = state.documents.list(&parse_filters(def, &params)?).await?;
    Ok(success_many(rows))
}

pub async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, AppError> {
    let row = state
        .documents
        .create(&body_to_record(body)?.without_protected())
        .await?;
    Ok(success_created(row))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let row = state
        .documents
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("document {}", id)))?;
    Ok(success_one(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let row = state
        .documents
        .update(&parse_id(&id)?, &body_to_record(body)?)
        .await?;
    Ok(success_one(row))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    state.documents.soft_delete(&parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
