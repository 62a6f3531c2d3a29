//! Standard response envelope helpers. Record keys leave the server in camelCase.

use crate::case::response_keys_to_camel_case;
use crate::record::Record;
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Serialize)]
pub struct SuccessMany {
    pub data: Vec<Value>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

fn one(status: StatusCode, record: Record) -> (StatusCode, Json<SuccessOne>) {
    (
        status,
        Json(SuccessOne {
            data: response_keys_to_camel_case(record.into_value()),
            meta: None,
        }),
    )
}

pub fn success_created(record: Record) -> (StatusCode, Json<SuccessOne>) {
    one(StatusCode::CREATED, record)
}

pub fn success_one(record: Record) -> (StatusCode, Json<SuccessOne>) {
    one(StatusCode::OK, record)
}

pub fn success_many(records: Vec<Record>) -> (StatusCode, Json<SuccessMany>) {
    let count = records.len() as u64;
    let data = records
        .into_iter()
        .map(|r| response_keys_to_camel_case(r.into_value()))
        .collect();
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

/// Count-only answer: `{ "data": null, "meta": { "count": n } }`.
pub fn success_count(count: u64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "data": Value::Null, "meta": { "count": count } })),
    )
}
