use super::{body_to_record, parse_filters, parse_id};
use crate::config::PROCESSES;
use crate::error::AppError;
use crate::response::{success_created, success_many, success_one};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let def = state.catalog.require(PROCESSES)?;
    let rows = state.processes.list(&parse_filters(def, &params)?).await?;
    Ok(success_many(rows))
}

pub async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, AppError> {
    let row = state
        .processes
        .create(&body_to_record(body)?.without_protected())
        .await?;
    Ok(success_created(row))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let row = state
        .processes
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("process {}", id)))?;
    Ok(success_one(row))
}
