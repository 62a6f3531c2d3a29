//! Router tests through `tower::ServiceExt::oneshot` over the in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use siagov::config::{INSTITUTION_SETTINGS, PROCESSES, TICKETS};
use siagov::{app, siagov_catalog, AppState, MemoryStore};
use std::sync::Arc;
use tower::ServiceExt;

fn setup() -> (Arc<MemoryStore>, Router) {
    let catalog = Arc::new(siagov_catalog().unwrap());
    let mem = Arc::new(MemoryStore::from_catalog(&catalog));
    let state = AppState::new(mem.clone(), catalog).unwrap();
    (mem, app(state))
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_and_ready() {
    let (_, router) = setup();
    let (status, body) = send(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    let (status, body) = send(&router, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], json!("ok"));
}

#[tokio::test]
async fn generic_entity_crud_with_soft_delete() {
    let (_, router) = setup();
    let (status, created) = send(
        &router,
        "POST",
        "/api/v1/entities/banks",
        Some(json!({ "code": "104", "name": "Caixa", "shortName": "CEF" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["shortName"], json!("CEF"));
    assert_eq!(created["data"]["excluded"], json!(false));
    let id = created["data"]["id"].as_str().unwrap().to_string();

    send(&router, "POST", "/api/v1/entities/banks", Some(json!({ "code": "001", "name": "Banco do Brasil" }))).await;

    let (_, list) = send(&router, "GET", "/api/v1/entities/banks?name.like=caix", None).await;
    assert_eq!(list["meta"]["count"], json!(1));

    let (status, patched) = send(
        &router,
        "PATCH",
        &format!("/api/v1/entities/banks/{}", id),
        Some(json!({ "name": "Caixa Econômica Federal", "excluded": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["data"]["excluded"], json!(false));

    let (status, _) = send(&router, "DELETE", &format!("/api/v1/entities/banks/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&router, "GET", &format!("/api/v1/entities/banks/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, count) = send(&router, "GET", "/api/v1/entities/banks/count", None).await;
    assert_eq!(count["meta"]["count"], json!(1));
}

#[tokio::test]
async fn unknown_entity_and_bad_ids() {
    let (_, router) = setup();
    let (status, body) = send(&router, "GET", "/api/v1/entities/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
    let (status, _) = send(&router, "GET", "/api/v1/entities/banks/42", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validation_errors_are_422() {
    let (_, router) = setup();
    let (status, body) = send(&router, "POST", "/api/v1/tickets", Some(json!({ "category": "Bug" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("validation_error"));
}

#[tokio::test]
async fn tickets_over_http() {
    let (_, router) = setup();
    let (status, created) = send(
        &router,
        "POST",
        "/api/v1/tickets",
        Some(json!({ "subject": "Sem acesso ao sistema", "requesterName": "Ana" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["requesterName"], json!("Ana"));
    assert_eq!(created["data"]["status"], json!("open"));
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/v1/tickets/{}/messages", id),
        Some(json!({ "body": "Verificando", "authorName": "Suporte" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, list) = send(&router, "GET", "/api/v1/tickets", None).await;
    assert_eq!(list["data"][0]["messageCount"], json!(1));

    let (_, closed) = send(&router, "POST", &format!("/api/v1/tickets/{}/close", id), None).await;
    assert_eq!(closed["data"]["status"], json!("closed"));

    let (_, msgs) = send(&router, "GET", &format!("/api/v1/tickets/{}/messages", id), None).await;
    assert_eq!(msgs["data"][0]["authorName"], json!("Suporte"));
}

#[tokio::test]
async fn settings_get_then_put() {
    let (_, router) = setup();
    let (status, empty) = send(&router, "GET", "/api/v1/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["data"], Value::Null);

    send(&router, "PUT", "/api/v1/settings", Some(json!({ "name": "Prefeitura", "logoUrl": "/logo.png" }))).await;
    send(&router, "PUT", "/api/v1/settings", Some(json!({ "city": "Recife" }))).await;
    let (_, current) = send(&router, "GET", "/api/v1/settings", None).await;
    assert_eq!(current["data"]["logoUrl"], json!("/logo.png"));
    assert_eq!(current["data"]["city"], json!("Recife"));
}

#[tokio::test]
async fn processes_list_survives_missing_table() {
    let (mem, router) = setup();
    mem.drop_table(PROCESSES);
    let (status, body) = send(&router, "GET", "/api/v1/processes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], json!(0));

    let (status, body) = send(&router, "POST", "/api/v1/processes", Some(json!({ "number": "1/2024" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], json!("schema_mismatch"));
}

#[tokio::test]
async fn subcategories_of_a_category() {
    let (_, router) = setup();
    let (_, cat) = send(&router, "POST", "/api/v1/entities/document_categories", Some(json!({ "name": "Atos" }))).await;
    let cat_id = cat["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/subcategories",
        Some(json!({ "name": "Portarias", "categoryId": cat_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, subs) = send(&router, "GET", &format!("/api/v1/categories/{}/subcategories", cat_id), None).await;
    assert_eq!(subs["meta"]["count"], json!(1));
    assert_eq!(subs["data"][0]["category"]["name"], json!("Atos"));
}

#[tokio::test]
async fn adapter_tables_refuse_generic_writes() {
    let (mem, router) = setup();
    for table in ["tickets", "ticket_messages", "institution_settings", "processes", "document_subcategories"] {
        let (status, body) = send(
            &router,
            "POST",
            &format!("/api/v1/entities/{}", table),
            Some(json!({ "name": "x", "subject": "x", "body": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", table);
        assert_eq!(body["error"]["code"], json!("method_not_allowed"));
        assert!(mem.rows(table).is_empty(), "{}", table);
    }
}

#[tokio::test]
async fn ticket_protocol_cannot_be_rewritten_through_entities() {
    let (mem, router) = setup();
    let (_, created) = send(&router, "POST", "/api/v1/tickets", Some(json!({ "subject": "Impressora" }))).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let protocol = created["data"]["protocol"].clone();

    let (status, _) = send(
        &router,
        "PATCH",
        &format!("/api/v1/entities/tickets/{}", id),
        Some(json!({ "protocol": "1999-0000", "active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&router, "DELETE", &format!("/api/v1/entities/tickets/{}", id), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, read) = send(&router, "GET", &format!("/api/v1/entities/tickets/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["data"]["protocol"], protocol);
    assert_eq!(read["data"]["active"], json!(true));
    assert_eq!(mem.rows(TICKETS).len(), 1);
}

#[tokio::test]
async fn settings_stay_single_row_under_generic_post() {
    let (mem, router) = setup();
    send(&router, "PUT", "/api/v1/settings", Some(json!({ "name": "Prefeitura" }))).await;
    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/entities/institution_settings",
        Some(json!({ "name": "Outra" })),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let live = mem.rows(INSTITUTION_SETTINGS).iter().filter(|r| !r.is_excluded()).count();
    assert_eq!(live, 1);
    let (_, current) = send(&router, "GET", "/api/v1/settings", None).await;
    assert_eq!(current["data"]["name"], json!("Prefeitura"));
}

#[tokio::test]
async fn deleted_ticket_cannot_be_updated() {
    let (_, router) = setup();
    let (_, created) = send(&router, "POST", "/api/v1/tickets", Some(json!({ "subject": "Rede" }))).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&router, "DELETE", &format!("/api/v1/tickets/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(
        &router,
        "PATCH",
        &format!("/api/v1/tickets/{}", id),
        Some(json!({ "priority": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
    let (status, _) = send(&router, "POST", &format!("/api/v1/tickets/{}/close", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mistyped_filters_are_400() {
    let (_, router) = setup();
    send(&router, "POST", "/api/v1/entities/positions", Some(json!({ "name": "Diretor", "level": 2 }))).await;

    let (status, body) = send(&router, "GET", "/api/v1/entities/positions?level=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
    let (status, _) = send(&router, "GET", "/api/v1/entities/positions/count?level=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&router, "GET", "/api/v1/tickets?active=maybe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = send(&router, "GET", "/api/v1/entities/positions?level=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["count"], json!(1));
}

#[tokio::test]
async fn generic_create_ignores_forged_identity() {
    let (_, router) = setup();
    let forged = "5f0c4a43-3b8e-4a8e-9d55-7a0f8f1b2c3d";
    let (status, created) = send(
        &router,
        "POST",
        "/api/v1/entities/banks",
        Some(json!({ "id": forged, "createdAt": "1999-01-01T00:00:00Z", "code": "104", "name": "Caixa" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(created["data"]["id"], json!(forged));
    assert!(!created["data"]["createdAt"].as_str().unwrap().starts_with("1999"));
}
