//! HTTP handlers: the generic entity endpoints and one module per entity adapter.

pub mod categories;
pub mod documents;
pub mod entity;
pub mod processes;
pub mod settings;
pub mod tickets;

use crate::case::{request_keys_to_snake_case, to_snake_case};
use crate::config::TableDef;
use crate::error::AppError;
use crate::record::{Record, ID, PROTECTED_COLUMNS};
use crate::service::Filters;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

/// Query parameters that are never filters.
const CONTROL_PARAMS: [&str; 2] = ["include", "limit"];
const LIKE_SUFFIX: &str = ".like";

pub(crate) fn parse_id(id: &str) -> Result<String, AppError> {
    uuid::Uuid::parse_str(id)
        .map(|u| u.to_string())
        .map_err(|_| AppError::BadRequest(format!("invalid uuid: {}", id)))
}

pub(crate) fn body_to_record(body: Value) -> Result<Record, AppError> {
    Record::from_value(request_keys_to_snake_case(body))
        .ok_or_else(|| AppError::BadRequest("body must be a JSON object".into()))
}

pub(crate) fn wants_include(params: &HashMap<String, String>) -> bool {
    params
        .get("include")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

pub(crate) fn parse_limit(params: &HashMap<String, String>) -> Result<Option<u32>, AppError> {
    params
        .get("limit")
        .map(|v| v.parse().map_err(|_| AppError::BadRequest(format!("invalid limit: {}", v))))
        .transpose()
}

/// `field=value` is equality, `field.like=value` a case-insensitive substring match.
/// Keys may be camelCase. Parameters naming no column of `table` are ignored; a value
/// that does not parse as its column's type is a bad request.
pub(crate) fn parse_filters(table: &TableDef, params: &HashMap<String, String>) -> Result<Filters, AppError> {
    let mut filters = Filters::new();
    for (key, raw) in params {
        if CONTROL_PARAMS.contains(&key.as_str()) {
            continue;
        }
        let (name, partial) = match key.strip_suffix(LIKE_SUFFIX) {
            Some(name) => (name, true),
            None => (key.as_str(), false),
        };
        let column = to_snake_case(name);
        let protected = PROTECTED_COLUMNS.contains(&column.as_str()) && column != ID;
        if protected || !table.has_column(&column) {
            tracing::debug!(table = %table.name, param = %key, "ignoring unknown filter");
            continue;
        }
        let value = if partial {
            Value::String(raw.clone())
        } else {
            query_value_for_column(table, &column, raw)
                .ok_or_else(|| AppError::BadRequest(format!("invalid value for {}: {}", key, raw)))?
        };
        filters.push(column, value, partial);
    }
    Ok(filters)
}

/// Query strings are text; booleans and integers are coerced for typed columns, other
/// typed values are checked and passed on as text. None when `s` is not of the column's type.
fn query_value_for_column(table: &TableDef, column: &str, s: &str) -> Option<Value> {
    let ty = table.pg_type(column).unwrap_or("text").to_lowercase();
    if s.is_empty() {
        return Some(Value::String(String::new()));
    }
    if ty.starts_with("bool") {
        return match s.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        };
    }
    if ty.contains("int") && ty != "interval" {
        return s.parse::<i64>().ok().map(|n| Value::Number(n.into()));
    }
    let valid = match ty.as_str() {
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        "numeric" | "decimal" | "real" | "double precision" | "float4" | "float8" => {
            s.parse::<f64>().map(f64::is_finite).unwrap_or(false)
        }
        "date" => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        t if t.starts_with("timestamp") => is_timestamp(s),
        _ => true,
    };
    valid.then(|| Value::String(s.to_string()))
}

fn is_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{siagov_catalog, POSITIONS, TICKETS};
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn filters_from_query_string() {
        let catalog = siagov_catalog().unwrap();
        let tickets = catalog.require(TICKETS).unwrap();
        let f = parse_filters(
            tickets,
            &params(&[
                ("status", "open"),
                ("subject.like", "luz"),
                ("active", "true"),
                ("requesterName", "Ana"),
                ("excluded", "true"),
                ("bogus", "x"),
                ("include", "true"),
            ]),
        )
        .unwrap();
        let mut got: Vec<(String, Value, bool)> = f.iter().map(|x| (x.field.clone(), x.value.clone(), x.partial)).collect();
        got.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            got,
            vec![
                ("active".to_string(), json!(true), false),
                ("requester_name".to_string(), json!("Ana"), false),
                ("status".to_string(), json!("open"), false),
                ("subject".to_string(), json!("luz"), true),
            ]
        );
    }

    #[test]
    fn mistyped_filter_values_are_bad_requests() {
        let catalog = siagov_catalog().unwrap();
        let positions = catalog.require(POSITIONS).unwrap();
        let tickets = catalog.require(TICKETS).unwrap();
        for (table, key, value) in [
            (positions, "level", "abc"),
            (tickets, "active", "yes"),
            (tickets, "openedAt", "yesterday"),
            (tickets, "id", "42"),
        ] {
            let err = parse_filters(table, &params(&[(key, value)])).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{}={}", key, value);
        }

        let ok = parse_filters(
            tickets,
            &params(&[("openedAt", "2024-03-01T10:00:00Z"), ("closedAt", "2024-03-02"), ("level.like", "abc")]),
        )
        .unwrap();
        assert_eq!(ok.iter().count(), 2);
        let level = parse_filters(positions, &params(&[("level", "3"), ("level.like", "x")])).unwrap();
        assert!(level.iter().any(|f| f.value == json!(3) && !f.partial));
    }

    #[test]
    fn ids_must_be_uuids() {
        assert!(matches!(parse_id("42"), Err(AppError::BadRequest(_))));
        assert!(parse_id("5f0c4a43-3b8e-4a8e-9d55-7a0f8f1b2c3d").is_ok());
    }

    #[test]
    fn bodies_must_be_objects() {
        assert!(body_to_record(json!([1])).is_err());
        let r = body_to_record(json!({ "categoryId": "c" })).unwrap();
        assert_eq!(r.get_str("category_id"), Some("c"));
    }
}
