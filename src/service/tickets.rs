//! Tickets ("chamados"): protocol numbers, opening defaults, message counts and messages.

use crate::config::{EntityCatalog, TableDef, TICKETS, TICKET_MESSAGES};
use crate::error::{AppError, ConfigError};
use crate::record::{Record, ID};
use crate::service::{Filters, RecordStore, RequestValidator};
use crate::store::DataStore;
use chrono::{Datelike, SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Key the derived message count is attached under.
pub const MESSAGE_COUNT: &str = "message_count";

pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";

pub struct TicketService {
    tickets: RecordStore,
    messages: RecordStore,
    table: TableDef,
    messages_table: TableDef,
}

impl TicketService {
    pub fn new(store: Arc<dyn DataStore>, catalog: &EntityCatalog) -> Result<Self, ConfigError> {
        Ok(TicketService {
            tickets: RecordStore::new(store.clone(), TICKETS),
            messages: RecordStore::new(store, TICKET_MESSAGES),
            table: catalog.require(TICKETS)?.clone(),
            messages_table: catalog.require(TICKET_MESSAGES)?.clone(),
        })
    }

    /// Live tickets, newest first, each with its live message count.
    /// Counts come from a grouped count on the messages table, not from the message rows.
    pub async fn list(&self, filters: &Filters) -> Result<Vec<Record>, AppError> {
        let mut rows = self.tickets.list(filters).await?;
        let ids: Vec<Value> = rows.iter().filter_map(|r| r.get(ID).cloned()).collect();
        let counts = self.messages.count_by("ticket_id", &ids).await?;
        for r in rows.iter_mut() {
            let n = r.id().and_then(|id| counts.get(id)).copied().unwrap_or(0);
            r.insert(MESSAGE_COUNT, n);
        }
        Ok(rows)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Record>, AppError> {
        let Some(mut row) = self.tickets.get_by_id(id).await? else {
            return Ok(None);
        };
        let n = self.messages.count(&Filters::new().eq("ticket_id", id)).await?;
        row.insert(MESSAGE_COUNT, n);
        Ok(Some(row))
    }

    /// Lookup that also returns soft-deleted tickets.
    pub async fn get_including_excluded(&self, id: &str) -> Result<Option<Record>, AppError> {
        self.tickets.get_by_id_including_excluded(id).await
    }

    /// Creates a ticket: protocol `{year}-{NNNN}` and `opened_at` when absent, `active` forced true,
    /// `status` defaulting to open.
    pub async fn create(&self, input: &Record) -> Result<Record, AppError> {
        let mut fields = input.clone();
        if fields.is_blank("protocol") {
            fields.insert("protocol", generate_protocol());
        }
        if fields.is_blank("opened_at") {
            fields.insert("opened_at", now());
        }
        if fields.is_blank("status") {
            fields.insert("status", STATUS_OPEN);
        }
        fields.insert("active", true);
        RequestValidator::validate(&self.table, &fields)?;
        let row = self.tickets.create(&fields).await?;
        tracing::info!(id = ?row.id(), protocol = ?row.get_str("protocol"), "ticket opened");
        Ok(row)
    }

    /// Protocol and opening time are fixed once the ticket exists.
    pub async fn update(&self, id: &str, partial: &Record) -> Result<Record, AppError> {
        let mut fields = partial.clone();
        fields.remove("protocol");
        fields.remove("opened_at");
        RequestValidator::validate_partial(&self.table, &fields)?;
        self.tickets.update(id, &fields).await
    }

    pub async fn close(&self, id: &str) -> Result<Record, AppError> {
        let mut fields = Record::new();
        fields.insert("status", STATUS_CLOSED);
        fields.insert("closed_at", now());
        self.tickets.update(id, &fields).await
    }

    pub async fn soft_delete(&self, id: &str) -> Result<(), AppError> {
        self.tickets.soft_delete(id).await
    }

    /// Appends a message to a live ticket.
    pub async fn add_message(&self, ticket_id: &str, input: &Record) -> Result<Record, AppError> {
        let mut fields = input.clone();
        fields.insert("ticket_id", ticket_id);
        if !fields.contains("internal") {
            fields.insert("internal", false);
        }
        RequestValidator::validate(&self.messages_table, &fields)?;
        if self.tickets.get_by_id(ticket_id).await?.is_none() {
            return Err(AppError::Validation(format!("ticket {} does not exist", ticket_id)));
        }
        self.messages.create(&fields).await
    }

    /// Live messages of a ticket, oldest first.
    pub async fn messages(&self, ticket_id: &str) -> Result<Vec<Record>, AppError> {
        let mut rows = self.messages.list(&Filters::new().eq("ticket_id", ticket_id)).await?;
        rows.reverse();
        Ok(rows)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `{year}-{4-digit random}`; the suffix comes from a v4 uuid's random bits.
pub fn generate_protocol() -> String {
    let suffix = (uuid::Uuid::new_v4().as_u128() % 10_000) as u32;
    format_protocol(Utc::now().year(), suffix)
}

pub fn format_protocol(year: i32, n: u32) -> String {
    format!("{}-{:04}", year, n % 10_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::siagov_catalog;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn record(v: Value) -> Record {
        Record::from_value(v).unwrap()
    }

    fn service() -> (Arc<MemoryStore>, TicketService) {
        let catalog = siagov_catalog().unwrap();
        let mem = Arc::new(MemoryStore::from_catalog(&catalog));
        let svc = TicketService::new(mem.clone(), &catalog).unwrap();
        (mem, svc)
    }

    #[test]
    fn protocol_format() {
        assert_eq!(format_protocol(2024, 7), "2024-0007");
        assert_eq!(format_protocol(2024, 12345), "2024-2345");
        let p = generate_protocol();
        assert!(regex::Regex::new(r"^\d{4}-\d{4}$").unwrap().is_match(&p));
    }

    #[tokio::test]
    async fn create_injects_defaults() {
        let (_, svc) = service();
        let t = svc
            .create(&record(json!({ "subject": "X", "category": "Bug", "active": false })))
            .await
            .unwrap();
        assert!(t.get_str("protocol").unwrap().starts_with(&Utc::now().year().to_string()));
        assert_eq!(t.get("active"), Some(&json!(true)));
        assert_eq!(t.get_str("status"), Some(STATUS_OPEN));
        assert!(t.get_str("opened_at").is_some());
        assert!(!t.is_excluded());
    }

    #[tokio::test]
    async fn create_keeps_supplied_protocol() {
        let (_, svc) = service();
        let t = svc
            .create(&record(json!({ "subject": "X", "protocol": "2023-0001" })))
            .await
            .unwrap();
        assert_eq!(t.get_str("protocol"), Some("2023-0001"));
    }

    #[tokio::test]
    async fn missing_subject_fails_before_any_store_call() {
        let (mem, svc) = service();
        let err = svc.create(&record(json!({ "category": "Bug" }))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(mem.requests(TICKETS), 0);
    }

    #[tokio::test]
    async fn list_counts_messages_in_one_request() {
        let (mem, svc) = service();
        let a = svc.create(&record(json!({ "subject": "A" }))).await.unwrap();
        let b = svc.create(&record(json!({ "subject": "B" }))).await.unwrap();
        let a_id = a.id().unwrap();
        for body in ["one", "two"] {
            svc.add_message(a_id, &record(json!({ "body": body }))).await.unwrap();
        }
        mem.reset_requests();

        let rows = svc.list(&Filters::new()).await.unwrap();
        assert_eq!(mem.requests(TICKET_MESSAGES), 1);
        let by_id: HashMap<&str, &Record> = rows.iter().map(|r| (r.id().unwrap(), r)).collect();
        assert_eq!(by_id[a_id].get(MESSAGE_COUNT), Some(&json!(2)));
        assert_eq!(by_id[b.id().unwrap()].get(MESSAGE_COUNT), Some(&json!(0)));
    }

    #[tokio::test]
    async fn list_counts_only_live_messages() {
        let (mem, svc) = service();
        let t = svc.create(&record(json!({ "subject": "A" }))).await.unwrap();
        let id = t.id().unwrap().to_string();
        for i in 0..25 {
            svc.add_message(&id, &record(json!({ "body": format!("m{}", i) }))).await.unwrap();
        }
        let gone = svc.add_message(&id, &record(json!({ "body": "removed" }))).await.unwrap();
        svc.messages.soft_delete(gone.id().unwrap()).await.unwrap();
        mem.reset_requests();
        let rows = svc.list(&Filters::new()).await.unwrap();
        assert_eq!(mem.requests(TICKET_MESSAGES), 1);
        assert_eq!(rows[0].get(MESSAGE_COUNT), Some(&json!(25)));
    }

    #[tokio::test]
    async fn close_on_deleted_ticket_fails() {
        let (mem, svc) = service();
        let t = svc.create(&record(json!({ "subject": "A" }))).await.unwrap();
        let id = t.id().unwrap().to_string();
        svc.soft_delete(&id).await.unwrap();

        let err = svc.close(&id).await.unwrap_err();
        assert!(matches!(err, AppError::Store(ref e) if e.kind == crate::store::StoreErrorKind::RowNotFound));
        let stored = &mem.rows(TICKETS)[0];
        assert_eq!(stored.get_str("status"), Some(STATUS_OPEN));
        assert!(stored.get("closed_at").map_or(true, Value::is_null));
    }

    #[tokio::test]
    async fn update_cannot_change_protocol() {
        let (_, svc) = service();
        let t = svc.create(&record(json!({ "subject": "A" }))).await.unwrap();
        let id = t.id().unwrap();
        let u = svc
            .update(id, &record(json!({ "protocol": "1999-0000", "priority": "high" })))
            .await
            .unwrap();
        assert_eq!(u.get("protocol"), t.get("protocol"));
        assert_eq!(u.get_str("priority"), Some("high"));
    }

    #[tokio::test]
    async fn close_sets_status_and_timestamp() {
        let (_, svc) = service();
        let t = svc.create(&record(json!({ "subject": "A" }))).await.unwrap();
        let closed = svc.close(t.id().unwrap()).await.unwrap();
        assert_eq!(closed.get_str("status"), Some(STATUS_CLOSED));
        assert!(closed.get_str("closed_at").is_some());
    }

    #[tokio::test]
    async fn messages_require_live_ticket_and_come_oldest_first() {
        let (_, svc) = service();
        let t = svc.create(&record(json!({ "subject": "A" }))).await.unwrap();
        let id = t.id().unwrap().to_string();
        svc.add_message(&id, &record(json!({ "body": "first" }))).await.unwrap();
        svc.add_message(&id, &record(json!({ "body": "second" }))).await.unwrap();
        let bodies: Vec<String> = svc
            .messages(&id)
            .await
            .unwrap()
            .iter()
            .filter_map(|m| m.get_str("body").map(String::from))
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);

        svc.soft_delete(&id).await.unwrap();
        let err = svc.add_message(&id, &record(json!({ "body": "late" }))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
