//! Services: the generic soft-delete record store, the join resolver and the per-entity adapters.

mod categories;
mod crud;
mod documents;
mod filter;
mod join;
mod processes;
mod settings;
mod tickets;
mod validation;

pub use categories::CategoryService;
pub use crud::{ListOptions, RecordStore};
pub use documents::DocumentService;
pub use filter::{Filter, Filters};
pub use join::JoinResolver;
pub use processes::ProcessService;
pub use settings::InstitutionSettingsService;
pub use tickets::{format_protocol, generate_protocol, TicketService, MESSAGE_COUNT, STATUS_CLOSED, STATUS_OPEN};
pub use validation::RequestValidator;
