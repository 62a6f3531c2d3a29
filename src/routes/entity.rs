//! Generic entity routes. The table is a path segment resolved against the catalog per request.

use crate::handlers::entity::{count, create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/entities/:table", get(list).post(create))
        .route("/entities/:table/count", get(count))
        .route(
            "/entities/:table/:id",
            get(read).patch(update).delete(delete_handler),
        )
        .with_state(state)
}
