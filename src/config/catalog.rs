//! Built-in SIAGOV catalog.

use crate::config::{ColumnDef, EntityCatalog, RelationDef, TableDef, ValidationRule};
use crate::error::ConfigError;

pub const BANKS: &str = "banks";
pub const SPHERES: &str = "spheres";
pub const MANAGEMENT_UNITS: &str = "management_units";
pub const SECTORS: &str = "sectors";
pub const POSITIONS: &str = "positions";
pub const DOCUMENT_CATEGORIES: &str = "document_categories";
pub const DOCUMENT_SUBCATEGORIES: &str = "document_subcategories";
pub const DOCUMENTS: &str = "documents";
pub const TICKETS: &str = "tickets";
pub const TICKET_MESSAGES: &str = "ticket_messages";
pub const INSTITUTION_SETTINGS: &str = "institution_settings";
pub const PROCESSES: &str = "processes";

/// Tables whose writes carry rules beyond the catalog and must go through their own routes.
pub const ADAPTER_OWNED: [&str; 5] = [
    TICKETS,
    TICKET_MESSAGES,
    INSTITUTION_SETTINGS,
    PROCESSES,
    DOCUMENT_SUBCATEGORIES,
];

pub fn is_adapter_owned(table: &str) -> bool {
    ADAPTER_OWNED.contains(&table)
}

fn name_rule() -> ValidationRule {
    ValidationRule::required().max_length(200)
}

/// Tables of the SIAGOV schema. `documents` deliberately lacks columns the domain model has
/// (content, token usage, version, legal basis); the document adapter drops them before writes.
pub fn siagov_catalog() -> Result<EntityCatalog, ConfigError> {
    let tables = vec![
        TableDef::new(
            BANKS,
            vec![ColumnDef::text("code"), ColumnDef::text("name").required(), ColumnDef::text("short_name")],
        )
        .rule("name", name_rule())
        .rule("code", ValidationRule::default().pattern(r"^\d{3}$")),
        TableDef::new(SPHERES, vec![ColumnDef::text("name").required(), ColumnDef::text("description")])
            .rule("name", name_rule()),
        TableDef::new(
            MANAGEMENT_UNITS,
            vec![
                ColumnDef::text("code"),
                ColumnDef::text("name").required(),
                ColumnDef::typed("sphere_id", "uuid"),
            ],
        )
        .relation(RelationDef::new("sphere", "sphere_id", SPHERES, &["name"]))
        .rule("name", name_rule()),
        TableDef::new(
            SECTORS,
            vec![
                ColumnDef::text("name").required(),
                ColumnDef::text("acronym"),
                ColumnDef::typed("management_unit_id", "uuid"),
            ],
        )
        .relation(RelationDef::new(
            "management_unit",
            "management_unit_id",
            MANAGEMENT_UNITS,
            &["code", "name"],
        ))
        .rule("name", name_rule())
        .rule("acronym", ValidationRule::default().max_length(20)),
        TableDef::new(
            POSITIONS,
            vec![
                ColumnDef::text("name").required(),
                ColumnDef::text("description"),
                ColumnDef::typed("level", "integer"),
            ],
        )
        .rule("name", name_rule()),
        TableDef::new(
            DOCUMENT_CATEGORIES,
            vec![ColumnDef::text("name").required(), ColumnDef::text("description")],
        )
        .rule("name", name_rule()),
        TableDef::new(
            DOCUMENT_SUBCATEGORIES,
            vec![
                ColumnDef::text("name").required(),
                ColumnDef::text("description"),
                ColumnDef::typed("category_id", "uuid"),
            ],
        )
        .relation(RelationDef::new("category", "category_id", DOCUMENT_CATEGORIES, &["name"]))
        .rule("name", name_rule())
        .rule("category_id", ValidationRule::required().format("uuid")),
        TableDef::new(
            DOCUMENTS,
            vec![
                ColumnDef::text("title").required(),
                ColumnDef::text("description"),
                ColumnDef::typed("category_id", "uuid"),
                ColumnDef::typed("subcategory_id", "uuid"),
                ColumnDef::typed("process_id", "uuid"),
                ColumnDef::text("file_url"),
                ColumnDef::text("file_name"),
                ColumnDef::typed("file_size", "bigint"),
                ColumnDef::text("mime_type"),
                ColumnDef::text("status"),
                ColumnDef::text("author_id"),
            ],
        )
        .relation(RelationDef::new("category", "category_id", DOCUMENT_CATEGORIES, &["name"]))
        .relation(RelationDef::new(
            "subcategory",
            "subcategory_id",
            DOCUMENT_SUBCATEGORIES,
            &["name", "category_id"],
        ))
        .rule("title", ValidationRule::required().max_length(300))
        .rule("status", ValidationRule::default().allowed(&["draft", "published", "archived"])),
        TableDef::new(
            TICKETS,
            vec![
                ColumnDef::text("protocol"),
                ColumnDef::text("subject").required(),
                ColumnDef::text("description"),
                ColumnDef::text("category"),
                ColumnDef::text("priority"),
                ColumnDef::text("status"),
                ColumnDef::text("requester_name"),
                ColumnDef::text("requester_email"),
                ColumnDef::typed("opened_at", "timestamptz"),
                ColumnDef::typed("closed_at", "timestamptz"),
                ColumnDef::typed("active", "boolean"),
            ],
        )
        .rule("subject", ValidationRule::required().max_length(200))
        .rule("protocol", ValidationRule::default().pattern(r"^\d{4}-\d{4}$"))
        .rule("priority", ValidationRule::default().allowed(&["low", "normal", "high", "urgent"]))
        .rule("status", ValidationRule::default().allowed(&["open", "in_progress", "closed"]))
        .rule("requester_email", ValidationRule::default().format("email")),
        TableDef::new(
            TICKET_MESSAGES,
            vec![
                ColumnDef::typed("ticket_id", "uuid").required(),
                ColumnDef::text("author_name"),
                ColumnDef::text("body").required(),
                ColumnDef::typed("internal", "boolean"),
            ],
        )
        .rule("ticket_id", ValidationRule::required().format("uuid"))
        .rule("body", ValidationRule::required()),
        TableDef::new(
            INSTITUTION_SETTINGS,
            vec![
                ColumnDef::text("name"),
                ColumnDef::text("cnpj"),
                ColumnDef::text("address"),
                ColumnDef::text("city"),
                ColumnDef::text("state"),
                ColumnDef::text("phone"),
                ColumnDef::text("email"),
                ColumnDef::text("website"),
                ColumnDef::text("logo_url"),
            ],
        )
        .rule("email", ValidationRule::default().format("email"))
        .rule("state", ValidationRule::default().max_length(2)),
        TableDef::new(
            PROCESSES,
            vec![
                ColumnDef::text("number").required(),
                ColumnDef::text("title"),
                ColumnDef::text("description"),
                ColumnDef::typed("parent_process_id", "uuid"),
                ColumnDef::typed("sector_id", "uuid"),
                ColumnDef::text("status"),
                ColumnDef::typed("opened_at", "timestamptz"),
            ],
        )
        .relation(RelationDef::new("parent", "parent_process_id", PROCESSES, &["number", "title"]))
        .relation(RelationDef::new("sector", "sector_id", SECTORS, &["name", "acronym"]))
        .rule("number", ValidationRule::required().max_length(50)),
    ];
    EntityCatalog::new(tables)
}
