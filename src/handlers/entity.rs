//! Generic entity handlers over any catalog table: list, count, create, read, update, soft delete.

use super::{body_to_record, parse_filters, parse_id, parse_limit, wants_include};
use crate::config::{is_adapter_owned, TableDef};
use crate::error::AppError;
use crate::response::{success_count, success_created, success_many, success_one};
use crate::service::{JoinResolver, ListOptions, RecordStore, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn resolve_table(state: &AppState, name: &str) -> Result<(TableDef, RecordStore), AppError> {
    let table = state
        .catalog
        .table(name)
        .ok_or_else(|| AppError::NotFound(format!("entity {}", name)))?;
    let records = state
        .records(name)
        .ok_or_else(|| AppError::NotFound(format!("entity {}", name)))?;
    Ok((table.clone(), records))
}

/// Writes to adapter-owned tables bypass their rules here, so they are refused.
fn writable_table(state: &AppState, name: &str) -> Result<(TableDef, RecordStore), AppError> {
    let resolved = resolve_table(state, name)?;
    if is_adapter_owned(name) {
        return Err(AppError::MethodNotAllowed(format!(
            "{} is written through its own endpoints",
            name
        )));
    }
    Ok(resolved)
}

pub async fn list(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (def, records) = resolve_table(&state, &table)?;
    let filters = parse_filters(&def, &params)?;
    let opts = ListOptions {
        columns: None,
        limit: parse_limit(&params)?,
    };
    let mut rows = records.list_with(&filters, &opts).await?;
    if wants_include(&params) {
        JoinResolver::new(state.store.clone())
            .resolve_many(&mut rows, &def.relations)
            .await?;
    }
    Ok(success_many(rows))
}

pub async fn count(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (def, records) = resolve_table(&state, &table)?;
    let n = records.count(&parse_filters(&def, &params)?).await?;
    Ok(success_count(n))
}

pub async fn create(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let (def, records) = writable_table(&state, &table)?;
    let fields = def.storable(&body_to_record(body)?).without_protected();
    RequestValidator::validate(&def, &fields)?;
    let row = records.create(&fields).await?;
    Ok(success_created(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let (def, records) = resolve_table(&state, &table)?;
    let id = parse_id(&id)?;
    let mut row = records
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {}", table, id)))?;
    if wants_include(&params) {
        JoinResolver::new(state.store.clone())
            .resolve_one(&mut row, &def.relations)
            .await?;
    }
    Ok(success_one(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let (def, records) = writable_table(&state, &table)?;
    let id = parse_id(&id)?;
    let fields = def.storable(&body_to_record(body)?);
    RequestValidator::validate_partial(&def, &fields)?;
    let row = records.update(&id, &fields).await?;
    Ok(success_one(row))
}

/// Soft delete; the row stays in the table with `excluded = true`.
pub async fn delete(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (_, records) = writable_table(&state, &table)?;
    records.soft_delete(&parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
