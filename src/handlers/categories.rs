use super::{body_to_record, parse_id};
use crate::error::AppError;
use crate::response::{success_created, success_many};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

pub async fn subcategories(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&category_id)?;
    let rows = state.categories.subcategories(Some(&id)).await?;
    Ok(success_many(rows))
}

pub async fn create_subcategory(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let row = state
        .categories
        .create_subcategory(&body_to_record(body)?.without_protected())
        .await?;
    Ok(success_created(row))
}
