//! Key casing at the HTTP edge: clients speak camelCase, tables use snake_case.

use serde_json::{Map, Value};

/// "message_count" -> "messageCount"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// "parentProcessId" -> "parent_process_id"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn rename_keys(obj: Map<String, Value>, f: fn(&str) -> String) -> Map<String, Value> {
    obj.into_iter().map(|(k, v)| (f(&k), v)).collect()
}

/// Top-level keys of a request object to snake_case. Nested values are stored as given.
pub fn request_keys_to_snake_case(value: Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(rename_keys(obj, to_snake_case)),
        other => other,
    }
}

/// Every object key of a response, resolved relations included, to camelCase.
pub fn response_keys_to_camel_case(value: Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(k, v)| (to_camel_case(&k), response_keys_to_camel_case(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(response_keys_to_camel_case).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers() {
        assert_eq!(to_camel_case("parent_process_id"), "parentProcessId");
        assert_eq!(to_camel_case("id"), "id");
        assert_eq!(to_snake_case("openedAt"), "opened_at");
        assert_eq!(to_snake_case("name"), "name");
    }

    #[test]
    fn responses_convert_nested_relations() {
        let v = response_keys_to_camel_case(json!([{
            "category_id": "c1",
            "category": { "short_name": "Atos" },
            "message_count": 2
        }]));
        assert_eq!(
            v,
            json!([{ "categoryId": "c1", "category": { "shortName": "Atos" }, "messageCount": 2 }])
        );
    }

    #[test]
    fn requests_convert_top_level_only() {
        let v = request_keys_to_snake_case(json!({ "requesterName": "Ana", "meta": { "keepMe": 1 } }));
        assert_eq!(v, json!({ "requester_name": "Ana", "meta": { "keepMe": 1 } }));
    }
}
