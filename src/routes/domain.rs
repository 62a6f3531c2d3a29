//! Routes backed by the entity adapters.

use crate::handlers::{categories, documents, processes, settings, tickets};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn domain_routes(state: AppState) -> Router {
    Router::new()
        .route("/tickets", get(tickets::list).post(tickets::create))
        .route(
            "/tickets/:id",
            get(tickets::read).patch(tickets::update).delete(tickets::delete),
        )
        .route("/tickets/:id/close", post(tickets::close))
        .route("/tickets/:id/messages", get(tickets::messages).post(tickets::add_message))
        .route("/documents", get(documents::list).post(documents::create))
        .route(
            "/documents/:id",
            get(documents::read).patch(documents::update).delete(documents::delete),
        )
        .route("/settings", get(settings::get).put(settings::put))
        .route("/processes", get(processes::list).post(processes::create))
        .route("/processes/:id", get(processes::read))
        .route("/categories/:id/subcategories", get(categories::subcategories))
        .route("/subcategories", post(categories::create_subcategory))
        .with_state(state)
}
